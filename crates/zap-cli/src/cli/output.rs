//! Terminal output helpers.

use colored::Colorize;

/// Consistent formatting for command output.
pub struct Display;

impl Display {
	pub fn header(text: &str) {
		println!("\n{}", text.bold().cyan());
		println!("{}", "─".repeat(text.chars().count()).cyan());
	}

	pub fn success(message: &str) {
		println!("{} {}", "✓".green().bold(), message);
	}

	/// Writes to stderr.
	pub fn error(message: &str) {
		eprintln!("{} {}", "✗".red().bold(), message.red());
	}

	pub fn warning(message: &str) {
		println!("{} {}", "⚠".yellow().bold(), message.yellow());
	}

	pub fn info(message: &str) {
		println!("{} {}", "ℹ".blue().bold(), message);
	}

	pub fn kv(key: &str, value: &str) {
		println!("  {} {}", format!("{key}:").bold(), value);
	}

	/// Prints a numbered list.
	pub fn steps(steps: &[String]) {
		for (i, step) in steps.iter().enumerate() {
			println!("  {}. {}", i + 1, step);
		}
	}

	/// Prints rows as left-aligned columns.
	pub fn table(headers: &[&str], rows: &[Vec<String>]) {
		let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
		for row in rows {
			for (i, cell) in row.iter().enumerate() {
				if let Some(width) = widths.get_mut(i) {
					*width = (*width).max(cell.chars().count());
				}
			}
		}

		let header_line = pad_row(headers.iter().map(|h| h.to_string()), &widths);
		println!("  {}", header_line.bold());
		for row in rows {
			println!("  {}", pad_row(row.iter().cloned(), &widths));
		}
	}
}

fn pad_row(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
	cells
		.zip(widths)
		.map(|(cell, width)| format!("{cell:<width$}"))
		.collect::<Vec<_>>()
		.join("  ")
		.trim_end()
		.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pad_row_aligns_columns() {
		let row = pad_row(
			vec!["yCRV".to_string(), "1.0".to_string(), "x".to_string()].into_iter(),
			&[6, 5, 1],
		);
		assert_eq!(row, "yCRV    1.0    x");
	}
}
