//! Money formatting for rendered messages.

use serde::Deserialize;

/// How monetary variables are printed, e.g. `$1.500.000`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
    pub decimals: u8,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "$".to_string(),
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
            decimals: 0,
        }
    }
}

impl CurrencyFormat {
    /// Formats `amount`, rounding half away from zero to `decimals` places.
    pub fn format(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return format!("{}{}", self.symbol, amount);
        }

        let scale = 10u64.pow(u32::from(self.decimals));
        let scaled = (amount.abs() * scale as f64).round() as u64;
        let whole = scaled / scale;
        let fraction = scaled % scale;

        let mut out = String::new();
        if amount < 0.0 && scaled > 0 {
            out.push('-');
        }
        out.push_str(&self.symbol);
        out.push_str(&group_thousands(whole, &self.thousands_separator));
        if self.decimals > 0 {
            out.push_str(&self.decimal_separator);
            out.push_str(&format!("{:0width$}", fraction, width = usize::from(self.decimals)));
        }
        out
    }
}

fn group_thousands(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}
