pub mod logging;

pub use logging::{
    log_case_outcome, log_case_start, log_cases_loaded, log_startup, print_final_stats,
    truncate_text,
};
