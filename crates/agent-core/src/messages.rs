//! Tool progress lines written to the transcript.

pub const SCREENSHOT_SENT: &str = "📸 Screenshot captured and sent to AI model for analysis";
pub const SCREENSHOT_FAILED: &str =
    "❌ Screenshot capture failed - unable to capture current tab";

pub fn executing(tool: &str) -> String {
    format!("🔧 Executing {tool}")
}

pub fn completed(tool: &str) -> String {
    format!("✅ {tool} completed")
}

pub fn failed(tool: &str, error: &str) -> String {
    format!("❌ {tool} failed: {error}")
}

pub fn undelivered(tool: &str) -> String {
    format!("{tool} result could not be sent to the assistant")
}
