//! # Encode Subcommand
//!
//! Prints the integer encoding an issuer signs for each raw attribute value.

use anyhow::Result;
use clap::Args;

use vcl_vc::AttributeValue;

/// Arguments for the encode subcommand.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw attribute values.
    #[arg(required = true)]
    pub values: Vec<String>,

    /// Print a JSON array instead of tab-separated lines.
    #[arg(long)]
    pub json: bool,
}

/// Execute the encode subcommand.
pub fn run_encode(args: &EncodeArgs) -> Result<u8> {
    let encoded = encode_all(&args.values);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&encoded)?);
    } else {
        for value in &encoded {
            println!("{}\t{}", value.raw, value.encoded);
        }
    }
    Ok(0)
}

fn encode_all(values: &[String]) -> Vec<AttributeValue> {
    values.iter().map(|raw| AttributeValue::new(raw.as_str())).collect()
}
