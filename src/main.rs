// Entry point for the ledger CLI
use clap::Parser;
use ledger_chain::{
    sign_payload, validate, Block, Blockchain, ChainStore, Command, Config, Keyring, LedgerView,
    Opt, Payload, Record, Reservation, Transfer, GLOBAL_CONFIG,
};
use log::{error, info, LevelFilter};
use std::env;
use std::process;

const PASSPHRASE_KEY: &str = "LEDGER_KEYRING_PASSPHRASE";

fn main() {
    // Info level shows appends and mining progress; RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn open_ledger(config: &Config) -> Result<Blockchain, Box<dyn std::error::Error>> {
    let store = config.open_store()?;
    Ok(Blockchain::initialize(store, config.ledger_options())?)
}

// Raw stored blocks, so a damaged store is reported rather than refused
fn read_blocks(config: &Config) -> Result<Vec<Block>, Box<dyn std::error::Error>> {
    let store = config.open_store()?;
    Ok(store.load()?)
}

fn open_keyring(config: &Config) -> Result<Keyring, Box<dyn std::error::Error>> {
    let passphrase = env::var(PASSPHRASE_KEY).ok();
    Ok(Keyring::open(&config.keyring_path(), passphrase.as_deref())?)
}

// Signs with the named keyring key when the producer asked for it
fn maybe_sign(
    config: &Config,
    payload: Payload,
    sign_with: Option<String>,
) -> Result<Payload, Box<dyn std::error::Error>> {
    match sign_with {
        None => Ok(payload),
        Some(name) => {
            let keyring = open_keyring(config)?;
            let key = keyring.require(&name)?;
            info!("Signing with key '{name}' ({})", key.fingerprint());
            Ok(sign_payload(key, payload)?)
        }
    }
}

fn append_and_report(
    config: &Config,
    payload: Payload,
    sign_with: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = maybe_sign(config, payload, sign_with)?;
    let ledger = open_ledger(config)?;
    let block = ledger.append(payload)?;
    println!("Appended block {}: {}", block.get_index(), block.get_hash());
    Ok(())
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let config = GLOBAL_CONFIG.as_ref().map_err(|e| e.clone())?;

    match command {
        Command::Init => {
            let ledger = open_ledger(config)?;
            let genesis = ledger.get(0).ok_or("ledger has no genesis block")?;
            println!(
                "Ledger ready with {} blocks (genesis {})",
                ledger.len(),
                genesis.get_hash()
            );
        }
        Command::Createkey { name } => {
            let mut keyring = open_keyring(config)?;
            let fingerprint = keyring.create_key(&name)?;
            println!("Created key '{name}': {fingerprint}");
        }
        Command::Listkeys => {
            let keyring = open_keyring(config)?;
            for name in keyring.names() {
                let key = keyring.require(&name)?;
                println!("{name}\t{}", key.fingerprint());
            }
        }
        Command::Reserve {
            first,
            last,
            plate,
            make,
            model,
            spot,
            pickup,
            dropoff,
            sign_with,
        } => {
            let payload = Payload::Reservation(Reservation {
                first,
                last,
                plate,
                make,
                model,
                spot,
                pickup,
                dropoff,
                ..Default::default()
            });
            append_and_report(config, payload, sign_with)?;
        }
        Command::Transfer {
            from,
            to,
            amount,
            sign_with,
        } => {
            let payload = Payload::Transfer(Transfer {
                from,
                to,
                amount,
                ..Default::default()
            });
            append_and_report(config, payload, sign_with)?;
        }
        Command::Record { fields, sign_with } => {
            let payload = Payload::Record(Record::from_pairs(
                fields.into_iter().map(|f| (f.key, f.value)),
            ));
            append_and_report(config, payload, sign_with)?;
        }
        Command::Printchain => {
            let ledger = open_ledger(config)?;
            for block in ledger.get_all() {
                println!("Index: {}", block.get_index());
                println!("Timestamp: {}", block.get_timestamp());
                println!("Prev. hash: {}", block.get_previous_hash());
                println!("Hash: {}", block.get_hash());
                if let Some(nonce) = block.get_nonce() {
                    println!("Nonce: {nonce}");
                }
                println!("Data: {}", serde_json::to_string(block.get_data())?);
                if let Some(status) = block.get_data().signature_status() {
                    println!("Signature: {status}");
                }
                println!();
            }
        }
        Command::Validate => {
            let blocks = read_blocks(config)?;
            let report = validate(&blocks);
            println!("{report}");
            if !report.valid {
                return Err(format!("chain {report}").into());
            }
        }
        Command::Audit => {
            let view = LedgerView::build(read_blocks(config)?);
            println!("{}", serde_json::to_string_pretty(&view)?);
            let bad = view.bad_signatures();
            if !bad.is_empty() {
                info!("Blocks with invalid signatures: {bad:?}");
            }
        }
    }
    Ok(())
}
