use anyhow::{Context, Result};

use crate::cargo;

/// `(package, features)`; an empty list means `--no-default-features`
const FEATURE_COMBINATIONS: &[(&str, &[&str])] = &[
    ("crmchat-common", &[]),
    ("crmchat-common", &["foundation"]),
    ("crmchat-core", &[]),
    ("crmchat-core", &["test-utils"]),
    ("crmchat-infra", &[]),
];

/// Check that the supported feature combinations compile.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, (package, features)) in FEATURE_COMBINATIONS.iter().enumerate() {
        let joined = features.join(",");
        let mut args = vec!["check", "-p", *package, "--no-default-features"];
        if !features.is_empty() {
            args.extend(["--features", joined.as_str()]);
        }
        let label = if features.is_empty() { "none" } else { joined.as_str() };

        println!(
            "\n[{}/{}] cargo {}",
            index + 1,
            FEATURE_COMBINATIONS.len(),
            args.join(" ")
        );
        cargo(&args).with_context(|| format!("{package} with features '{label}' failed to compile"))?;
        println!("✅ {package} [{label}] compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());
    Ok(())
}
