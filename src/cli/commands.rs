use clap::{Parser, Subcommand};
use std::str::FromStr;

/// One `KEY=VALUE` argument of a free-form record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldArg {
    pub key: String,
    pub value: String,
}

impl FromStr for FieldArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(FieldArg {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("Invalid field: {s}. Expected KEY=VALUE")),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ledger-chain")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "init", about = "Open the ledger, creating the genesis block if needed")]
    Init,
    #[command(name = "createkey", about = "Generate a named signing key in the keyring")]
    Createkey {
        #[arg(help = "Name to store the key under")]
        name: String,
    },
    #[command(name = "listkeys", about = "Print keyring key names and fingerprints")]
    Listkeys,
    #[command(name = "reserve", about = "Append a reservation record")]
    Reserve {
        first: String,
        last: String,
        plate: String,
        make: String,
        model: String,
        spot: String,
        #[arg(help = "Pickup time")]
        pickup: String,
        #[arg(help = "Dropoff time")]
        dropoff: String,
        #[arg(long = "sign-with", help = "Sign the record with this keyring key")]
        sign_with: Option<String>,
    },
    #[command(name = "transfer", about = "Append a value transfer record")]
    Transfer {
        #[arg(help = "Sending party")]
        from: String,
        #[arg(help = "Receiving party")]
        to: String,
        #[arg(help = "Amount to transfer")]
        amount: u64,
        #[arg(long = "sign-with", help = "Sign the record with this keyring key")]
        sign_with: Option<String>,
    },
    #[command(name = "record", about = "Append a free-form KEY=VALUE record")]
    Record {
        #[arg(required = true, help = "Fields as KEY=VALUE")]
        fields: Vec<FieldArg>,
        #[arg(long = "sign-with", help = "Sign the record with this keyring key")]
        sign_with: Option<String>,
    },
    #[command(name = "printchain", about = "Print all blocks in the ledger")]
    Printchain,
    #[command(name = "validate", about = "Check chain linkage and block hashes")]
    Validate,
    #[command(name = "audit", about = "Print the chain as JSON with signature status")]
    Audit,
}
