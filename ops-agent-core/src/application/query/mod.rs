mod executor;
mod formatters;
mod summarizer;
mod time_range;

pub use executor::{QueryExecutor, QueryOutcome, render_outcomes};
pub use formatters::Formatter;
pub use summarizer::{LlmSummarizer, format_for_prompt};
pub use time_range::{
    TIME_PARAM_KEYS, add_time_params, add_time_params_at, has_time_params, parse_time_range,
};
