use crate::types::Alert;

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    // Colors
    pub const RED: &'static str = "\x1b[31m";
    pub const WHITE: &'static str = "\x1b[37m";
    pub const GRAY: &'static str = "\x1b[90m";

    // Bright colors
    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Table,
        }
    }
}

const TABLE_TOP: &str =
    "┌───────┬────────────┬───────┬───────┬──────────┬──────────────────────────┐";
const TABLE_SEPARATOR: &str =
    "├───────┼────────────┼───────┼───────┼──────────┼──────────────────────────┤";

pub struct AlertFormatter {
    format: OutputFormat,
    colored: bool,
    quiet: bool,
    alert_count: u64,
}

impl AlertFormatter {
    pub fn new(format: OutputFormat, colored: bool, quiet: bool) -> Self {
        Self {
            format,
            colored,
            quiet,
            alert_count: 0,
        }
    }

    pub fn alert_count(&self) -> u64 {
        self.alert_count
    }

    pub fn print_header(&self) {
        if self.quiet || self.format != OutputFormat::Table {
            return;
        }

        let (gray, reset) = self.frame_colors();
        println!("{}{}{}", gray, TABLE_TOP, reset);
        println!(
            "{}│{} {:<5} {}│{} {:<10} {}│{} {:<5} {}│{} {:<5} {}│{} {:<8} {}│{} {:<24} {}│{}",
            gray,
            reset,
            "COUNT",
            gray,
            reset,
            "TYPE",
            gray,
            reset,
            "TRACK",
            gray,
            reset,
            "SCORE",
            gray,
            reset,
            "TIME",
            gray,
            reset,
            "DETAIL",
            gray,
            reset
        );
        println!("{}{}{}", gray, TABLE_SEPARATOR, reset);
    }

    /// Prints a live alert and counts it.
    pub fn print_alert(&mut self, alert: &Alert) {
        self.alert_count += 1;
        println!("{}", self.format_alert(alert, self.alert_count));
    }

    /// Prints an alert loaded from history without counting it.
    pub fn print_history_alert(&self, alert: &Alert) {
        if self.quiet {
            return;
        }
        println!("{}", self.format_alert(alert, 0));
    }

    pub fn format_alert(&self, alert: &Alert, count: u64) -> String {
        match self.format {
            OutputFormat::Table => self.table_row(alert, count),
            OutputFormat::Json => Self::json_row(alert, count),
            OutputFormat::Minimal => self.minimal_row(alert),
        }
    }

    fn table_row(&self, alert: &Alert, count: u64) -> String {
        let (gray, reset) = self.frame_colors();
        let type_color = if self.colored {
            alert_color(&alert.alert_type)
        } else {
            ""
        };
        let count = if count == 0 {
            "-".to_string()
        } else {
            count.to_string()
        };

        format!(
            "{}│{} {:<5} {}│{} {}{:<10}{} {}│{} {:<5} {}│{} {:<5.2} {}│{} {:<8} {}│{} {:<24} {}│{}",
            gray,
            reset,
            count,
            gray,
            reset,
            type_color,
            truncate(&alert.alert_type, 10),
            reset,
            gray,
            reset,
            alert.track_id,
            gray,
            reset,
            alert.suspicion_score,
            gray,
            reset,
            alert.datetime_local().format("%H:%M:%S"),
            gray,
            reset,
            truncate(&alert.detail(), 24),
            gray,
            reset
        )
    }

    fn json_row(alert: &Alert, count: u64) -> String {
        let json_obj = serde_json::json!({
            "count": count,
            "id": alert.id,
            "type": alert.alert_type,
            "track_id": alert.track_id,
            "suspicion_score": alert.suspicion_score,
            "location": alert.location,
            "detail": alert.detail(),
            "local_time": alert.datetime_local().format("%Y-%m-%d %H:%M:%S").to_string(),
            "unix_timestamp": alert.timestamp,
        });

        serde_json::to_string(&json_obj).unwrap_or_default()
    }

    fn minimal_row(&self, alert: &Alert) -> String {
        let (color, reset) = if self.colored {
            (alert_color(&alert.alert_type), Colors::RESET)
        } else {
            ("", "")
        };

        format!(
            "{} {}{}{} #{} {}",
            alert.datetime_local().format("%H:%M:%S"),
            color,
            alert.alert_type.to_uppercase(),
            reset,
            alert.track_id,
            alert.detail()
        )
        .trim_end()
        .to_string()
    }

    fn frame_colors(&self) -> (&'static str, &'static str) {
        if self.colored {
            (Colors::GRAY, Colors::RESET)
        } else {
            ("", "")
        }
    }

    pub fn print_summary(&self, total_alerts: u64, frames: u64, duration_secs: u64) {
        if self.quiet {
            return;
        }

        let rate = if duration_secs > 0 {
            frames as f64 / duration_secs as f64
        } else {
            0.0
        };

        println!();
        if self.colored {
            println!(
                "{}{}Summary: {} alerts, {} frames in {}s ({:.1} fps){}",
                Colors::BOLD,
                Colors::BRIGHT_CYAN,
                total_alerts,
                frames,
                duration_secs,
                rate,
                Colors::RESET
            );
        } else {
            println!(
                "Summary: {} alerts, {} frames in {}s ({:.1} fps)",
                total_alerts, frames, duration_secs, rate
            );
        }
    }
}

fn alert_color(alert_type: &str) -> &'static str {
    match alert_type {
        "intrusion" => Colors::BRIGHT_RED,
        "loitering" => Colors::BRIGHT_YELLOW,
        "pacing" => Colors::BRIGHT_MAGENTA,
        _ => Colors::BRIGHT_BLUE,
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
