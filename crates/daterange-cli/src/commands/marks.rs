use clap::Args;
use daterange_core::{compute_markings, RangeState};

use super::parse_pick;

#[derive(Args)]
pub struct MarksArgs {
    /// Range start (epoch millis, yyyy-MM-dd, or RFC 3339)
    #[arg(long)]
    start: String,
    /// Range end; omit for a pending range
    #[arg(long)]
    end: Option<String>,
}

pub fn run(args: MarksArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Same path as the calendar: picks through the state machine.
    let mut state = RangeState::Empty.transition(Some(parse_pick(&args.start)?)).state;
    if let Some(end) = &args.end {
        state = state.transition(Some(parse_pick(end)?)).state;
    }
    let marks = compute_markings(&state);
    println!("{}", serde_json::to_string_pretty(&marks)?);
    Ok(())
}
