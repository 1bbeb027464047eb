use anyhow::Result;

use super::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("CartPilot System Information");
    println!("============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!("Git Branch: {}", env!("GIT_BRANCH"));
    println!();

    println!("Configuration ({}):", ctx.config_path().display());
    println!("- Channel: {}", config.channel.ws_url);
    println!("- HTTP backend: {}", config.channel.http_base_url);
    println!(
        "- Binary frames: {}",
        if config.channel.binary_frames {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("- DevTools: {}", config.browser.devtools.devtools_url);
    println!(
        "- Restricted pages: {}",
        config.browser.capture.restricted_prefixes.join(", ")
    );
    match config.validate() {
        Ok(()) => println!("- Status: ✓ valid"),
        Err(err) => println!("- Status: ✗ {err}"),
    }

    Ok(())
}
