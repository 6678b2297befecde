//! Message template rendering.

mod currency;
mod renderer;

pub use currency::CurrencyFormat;
pub use renderer::VariableRenderer;
