use clap::Args;
use daterange_core::{build_query, CommittedValue, FieldConfig, QueryFormat};

use super::parse_pick;

#[derive(Args)]
pub struct QueryArgs {
    /// Field to filter on; pass twice for a start/end field pair
    #[arg(long = "field", required = true)]
    fields: Vec<String>,
    /// Range start (epoch millis, yyyy-MM-dd, or RFC 3339)
    #[arg(long)]
    start: String,
    /// Range end
    #[arg(long)]
    end: String,
    /// Query date format (epoch_millis, epoch_seconds, or a named pattern)
    #[arg(long, default_value = "epoch_millis")]
    format: String,
}

pub fn run(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let fields = FieldConfig::from_fields(args.fields.as_slice())?;
    let format: QueryFormat = args.format.parse()?;
    let start = parse_pick(&args.start)?;
    let end = parse_pick(&args.end)?;
    let value = CommittedValue::try_new(start.timestamp, end.timestamp)?;
    let query = build_query(Some(&value), &fields, &format);
    println!("{}", serde_json::to_string_pretty(&query)?);
    Ok(())
}
