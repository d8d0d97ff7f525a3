//! Human-readable formatting helpers.

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Formats a byte count with binary (1024-based) units and at most two
/// decimals, e.g. `1536` → `"1.5 KB"`.
pub fn format_file_size(bytes: f64) -> String {
	if !bytes.is_finite() || bytes <= 0.0 {
		return "0 Bytes".to_string();
	}
	let mut value = bytes;
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1 {
		value /= 1024.0;
		unit += 1;
	}
	format!("{} {}", trim_decimals(value), UNITS[unit])
}

fn trim_decimals(value: f64) -> String {
	let fixed = format!("{:.2}", value);
	if fixed.contains('.') {
		fixed.trim_end_matches('0').trim_end_matches('.').to_string()
	} else {
		fixed
	}
}

/// Shortens `text` to 17 characters plus an ellipsis when it is longer
/// than 20 characters.
pub fn truncate_label(text: &str) -> String {
	if text.chars().count() > 20 {
		let head: String = text.chars().take(17).collect();
		format!("{}...", head)
	} else {
		text.to_string()
	}
}
