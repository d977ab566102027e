use borsh::BorshDeserialize;
use clap::{
    crate_description, crate_name, crate_version, value_t_or_exit, App, AppSettings, Arg,
    ArgMatches, SubCommand,
};
use flight_surety::state::{
    find_airline_address, find_flight_address, find_policy_address, flight_key, Airline, Flight,
    FlightStatus, InsurancePolicy, Ledger, Record, LEDGER_DATA_LEN,
};
use solana_clap_utils::{
    fee_payer::fee_payer_arg,
    input_validators::{is_url_or_moniker, is_valid_pubkey, normalize_to_url_if_moniker},
};
use solana_client::rpc_client::RpcClient;
use solana_program::native_token::{lamports_to_sol, sol_to_lamports};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    system_instruction,
    transaction::Transaction,
};
use std::{error::Error, process::exit};

type CommandResult = Result<(), Box<dyn Error>>;

// Helper functions
fn ledger_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("ledger")
        .value_name("LEDGER_PUBKEY")
        .validator(is_valid_pubkey)
        .takes_value(true)
        .required(true)
        .help("Ledger data account")
}

fn pubkey_arg<'a, 'b>(name: &'a str, help: &'a str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .value_name("PUBKEY")
        .validator(is_valid_pubkey)
        .takes_value(true)
        .required(true)
        .help(help)
}

fn flight_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("code")
            .value_name("CODE")
            .validator(is_valid_flight_code)
            .takes_value(true)
            .required(true)
            .help("Flight code"),
        Arg::with_name("departure")
            .value_name("TIMESTAMP")
            .validator(is_valid_departure)
            .takes_value(true)
            .required(true)
            .allow_hyphen_values(true)
            .help("Departure timestamp"),
    ]
}

fn sol_arg<'a, 'b>(help: &'a str) -> Arg<'a, 'b> {
    Arg::with_name("amount")
        .value_name("SOL")
        .validator(is_valid_sol)
        .takes_value(true)
        .required(true)
        .help(help)
}

fn get_clap_app<'a, 'b>(name: &'a str, desc: &'a str, version: &'a str) -> App<'a, 'b> {
    App::new(name)
        .about(desc)
        .version(version)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(fee_payer_arg().global(true))
        .arg(
            Arg::with_name("json_rpc_url")
                .short("u")
                .long("url")
                .value_name("URL_OR_MONIKER")
                .takes_value(true)
                .global(true)
                .validator(is_url_or_moniker)
                .help(
                    "URL for Solana's JSON RPC or moniker (or their first letter): \
                       [mainnet-beta, testnet, devnet, localhost] \
                    Default is devnet",
                ),
        )
        .subcommand(
            SubCommand::with_name("init")
                .about("Creates the ledger account, the fee payer becomes the first airline")
                .arg(pubkey_arg("oracle", "Key allowed to resolve flight statuses")),
        )
        .subcommand(
            SubCommand::with_name("register-airline")
                .about("Registers an airline, or votes for it once four airlines are registered")
                .arg(ledger_arg())
                .arg(pubkey_arg("candidate", "Airline to register")),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Votes for a candidate airline")
                .arg(ledger_arg())
                .arg(pubkey_arg("candidate", "Airline to vote for")),
        )
        .subcommand(
            SubCommand::with_name("fund")
                .about("Pays airline funding into the ledger")
                .arg(ledger_arg())
                .arg(sol_arg("Funding in SOL, at least 10")),
        )
        .subcommand(
            SubCommand::with_name("register-flight")
                .about("Registers a flight of the fee payer airline")
                .arg(ledger_arg())
                .args(&flight_args()),
        )
        .subcommand(
            SubCommand::with_name("resolve")
                .about("Records a flight status as the oracle")
                .arg(ledger_arg())
                .arg(pubkey_arg("airline", "Airline operating the flight"))
                .args(&flight_args())
                .arg(
                    Arg::with_name("status")
                        .value_name("STATUS_CODE")
                        .validator(is_valid_status)
                        .takes_value(true)
                        .required(true)
                        .help("10 on time, 20 late airline, 30 weather, 40 technical, 50 other"),
                ),
        )
        .subcommand(
            SubCommand::with_name("buy")
                .about("Buys insurance on a flight")
                .arg(ledger_arg())
                .arg(pubkey_arg("airline", "Airline operating the flight"))
                .args(&flight_args())
                .arg(sol_arg("Premium in SOL, at most 1")),
        )
        .subcommand(
            SubCommand::with_name("refresh")
                .about("Recomputes a passenger's credit from the flight status")
                .arg(ledger_arg())
                .arg(pubkey_arg("passenger", "Insured passenger"))
                .arg(pubkey_arg("airline", "Airline operating the flight"))
                .args(&flight_args()),
        )
        .subcommand(
            SubCommand::with_name("withdraw")
                .about("Withdraws the fee payer's credit on a flight")
                .arg(ledger_arg())
                .arg(pubkey_arg("airline", "Airline operating the flight"))
                .args(&flight_args()),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Show ledger counters")
                .arg(ledger_arg()),
        )
        .subcommand(
            SubCommand::with_name("show-airline")
                .about("Show an airline's registration, funding and votes")
                .arg(ledger_arg())
                .arg(pubkey_arg("airline", "Airline to show")),
        )
        .subcommand(
            SubCommand::with_name("show-flight")
                .about("Show a registered flight")
                .arg(ledger_arg())
                .arg(pubkey_arg("airline", "Airline operating the flight"))
                .args(&flight_args()),
        )
        .subcommand(
            SubCommand::with_name("show-policy")
                .about("Show a passenger's policy")
                .arg(ledger_arg())
                .arg(pubkey_arg("passenger", "Insured passenger"))
                .arg(pubkey_arg("airline", "Airline operating the flight"))
                .args(&flight_args()),
        )
}

fn is_valid_flight_code(string: String) -> Result<(), String> {
    flight_surety::flights::check_flight_code(&string)
        .map_err(|_| format!("Invalid flight code {}", string))
}

fn is_valid_departure(string: String) -> Result<(), String> {
    match string.parse::<i64>() {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("Invalid departure timestamp {}", string)),
    }
}

fn is_valid_sol(string: String) -> Result<(), String> {
    match string.parse::<f64>() {
        Ok(amount) if amount > 0.0 => Ok(()),
        _ => Err(format!("Invalid SOL amount {}", string)),
    }
}

fn is_valid_status(string: String) -> Result<(), String> {
    match string.parse::<u8>().ok().and_then(FlightStatus::from_code) {
        Some(status) if status != FlightStatus::Unknown => Ok(()),
        _ => Err(format!("Invalid status code {}", string)),
    }
}

fn flight_values(arg_matches: &ArgMatches) -> (String, i64) {
    let code = value_t_or_exit!(arg_matches, "code", String);
    let departure = value_t_or_exit!(arg_matches, "departure", i64);
    (code, departure)
}

fn send(
    client: &RpcClient,
    payer: &Keypair,
    instructions: &[Instruction],
    extra_signers: &[&Keypair],
) -> CommandResult {
    let mut signers = vec![payer];
    signers.extend_from_slice(extra_signers);

    let recent_blockhash = client.get_latest_blockhash()?;
    let transaction = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &signers,
        recent_blockhash,
    );
    let signature = client.send_and_confirm_transaction_with_spinner(&transaction)?;
    println!("Signature: {}", signature);
    Ok(())
}

// Records the program never created read as missing.
fn load_record<T: Record>(client: &RpcClient, address: &Pubkey) -> Result<T, Box<dyn Error>> {
    let account = client
        .get_account_with_commitment(address, client.commitment())?
        .value
        .ok_or_else(|| format!("Account {} not found", address))?;
    if account.owner != flight_surety::id() {
        return Err(format!("Account {} is not owned by the program", address).into());
    }
    let record: T = BorshDeserialize::deserialize(&mut account.data.as_slice())?;
    if !record.is_initialized() {
        return Err(format!("Account {} is not initialized", address).into());
    }
    Ok(record)
}

// CLI commands handlers
fn init(client: &RpcClient, payer: &Keypair, oracle: &Pubkey, ledger_address: &Keypair) -> CommandResult {
    let instructions = vec![
        system_instruction::create_account(
            &payer.pubkey(),
            &ledger_address.pubkey(),
            client.get_minimum_balance_for_rent_exemption(LEDGER_DATA_LEN)?,
            LEDGER_DATA_LEN as u64,
            &flight_surety::id(),
        ),
        flight_surety::instruction::initialize_ledger(
            &flight_surety::id(),
            &payer.pubkey(),
            &ledger_address.pubkey(),
            oracle,
        )?,
    ];
    send(client, payer, &instructions, &[ledger_address])
}

fn show(client: &RpcClient, ledger_address: &Pubkey) -> CommandResult {
    let ledger = load_record::<Ledger>(client, ledger_address)?;
    println!("Authority: {}", Pubkey::new_from_array(ledger.authority));
    println!("Oracle: {}", Pubkey::new_from_array(ledger.oracle));
    println!("Registered airlines: {}", ledger.number_of_airlines);
    println!("Flights: {}", ledger.number_of_flights);
    println!("Insured passengers: {}", ledger.number_of_insured_passengers);
    println!("Vault: {} SOL", lamports_to_sol(client.get_balance(ledger_address)?));
    Ok(())
}

fn show_airline(client: &RpcClient, ledger_address: &Pubkey, airline: &Pubkey) -> CommandResult {
    let address = find_airline_address(&flight_surety::id(), ledger_address, airline);
    let record = load_record::<Airline>(client, &address)?;
    println!("Record: {}", address);
    println!(
        "Registered: {}, funded: {} SOL, votes: {}",
        record.registered,
        lamports_to_sol(record.funded_amount),
        record.votes
    );
    Ok(())
}

fn show_flight(
    client: &RpcClient,
    ledger_address: &Pubkey,
    airline: &Pubkey,
    code: &str,
    departure: i64,
) -> CommandResult {
    let key = flight_key(airline, code, departure);
    let address = find_flight_address(&flight_surety::id(), ledger_address, &key);
    let flight = load_record::<Flight>(client, &address)?;
    println!("Flight key: {}", Pubkey::new_from_array(key));
    println!("Record: {}", address);
    println!("{:?}", flight);
    Ok(())
}

fn show_policy(
    client: &RpcClient,
    ledger_address: &Pubkey,
    passenger: &Pubkey,
    airline: &Pubkey,
    code: &str,
    departure: i64,
) -> CommandResult {
    let key = flight_key(airline, code, departure);
    let address = find_policy_address(&flight_surety::id(), ledger_address, passenger, &key);
    let policy = load_record::<InsurancePolicy>(client, &address)?;
    println!("Record: {}", address);
    println!("{:?}", policy);
    println!(
        "Premium: {} SOL, credited: {} SOL, paid: {}",
        lamports_to_sol(policy.premium),
        lamports_to_sol(policy.credited_amount),
        policy.paid
    );
    Ok(())
}

fn process_command(client: &RpcClient, payer: &Keypair, app_matches: &ArgMatches) -> CommandResult {
    let program_id = flight_surety::id();

    match app_matches.subcommand() {
        ("init", Some(arg_matches)) => {
            let oracle = value_t_or_exit!(arg_matches, "oracle", Pubkey);
            let address = Keypair::new();
            println!(
                "Generated new keypair for ledger account: {}",
                address.pubkey()
            );
            init(client, payer, &oracle, &address)
        }

        ("register-airline", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let candidate = value_t_or_exit!(arg_matches, "candidate", Pubkey);
            println!("Registering airline: {}", candidate);
            let instruction = flight_surety::instruction::register_airline(
                &program_id,
                &payer.pubkey(),
                &ledger,
                &candidate,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("vote", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let candidate = value_t_or_exit!(arg_matches, "candidate", Pubkey);
            println!("Voting for airline: {}", candidate);
            let instruction = flight_surety::instruction::cast_vote(
                &program_id,
                &payer.pubkey(),
                &ledger,
                &candidate,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("fund", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let amount = sol_to_lamports(value_t_or_exit!(arg_matches, "amount", f64));
            println!("Funding airline {} with {} lamports", payer.pubkey(), amount);
            let instruction = flight_surety::instruction::fund_airline(
                &program_id,
                &payer.pubkey(),
                &ledger,
                amount,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("register-flight", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            println!(
                "Registering flight {} at {}, key: {}",
                code,
                departure,
                Pubkey::new_from_array(flight_key(&payer.pubkey(), &code, departure))
            );
            let instruction = flight_surety::instruction::register_flight(
                &program_id,
                &payer.pubkey(),
                &ledger,
                &code,
                departure,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("resolve", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            let status = FlightStatus::from_code(value_t_or_exit!(arg_matches, "status", u8))
                .ok_or("Invalid status code")?;
            println!("Resolving flight {} at {} to {:?}", code, departure, status);
            let instruction = flight_surety::instruction::resolve_flight_status(
                &program_id,
                &payer.pubkey(),
                &ledger,
                &airline,
                &code,
                departure,
                status,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("buy", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            let premium = sol_to_lamports(value_t_or_exit!(arg_matches, "amount", f64));
            println!("Insuring flight {} at {} for {} lamports", code, departure, premium);
            let instruction = flight_surety::instruction::buy_insurance(
                &program_id,
                &payer.pubkey(),
                &ledger,
                &airline,
                &code,
                departure,
                premium,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("refresh", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let passenger = value_t_or_exit!(arg_matches, "passenger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            println!("Refreshing credit of {} on {}", passenger, code);
            let instruction = flight_surety::instruction::refresh_credit(
                &program_id,
                &ledger,
                &passenger,
                &airline,
                &code,
                departure,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("withdraw", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            let key = flight_key(&airline, &code, departure);
            println!("Withdrawing credit on {} at {}", code, departure);
            let instruction = flight_surety::instruction::withdraw(
                &program_id,
                &payer.pubkey(),
                &ledger,
                &key,
                &code,
                departure,
            )?;
            send(client, payer, &[instruction], &[])
        }

        ("show", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            println!("Information of ledger: {}", ledger);
            show(client, &ledger)
        }

        ("show-airline", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            show_airline(client, &ledger, &airline)
        }

        ("show-flight", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            show_flight(client, &ledger, &airline, &code, departure)
        }

        ("show-policy", Some(arg_matches)) => {
            let ledger = value_t_or_exit!(arg_matches, "ledger", Pubkey);
            let passenger = value_t_or_exit!(arg_matches, "passenger", Pubkey);
            let airline = value_t_or_exit!(arg_matches, "airline", Pubkey);
            let (code, departure) = flight_values(arg_matches);
            show_policy(client, &ledger, &passenger, &airline, &code, departure)
        }

        _ => {
            println!("{}", app_matches.usage());
            Ok(())
        }
    }
}

fn main() {
    let app_matches =
        get_clap_app(crate_name!(), crate_description!(), crate_version!()).get_matches();

    let config = solana_cli_config::CONFIG_FILE
        .as_ref()
        .and_then(|config_file| solana_cli_config::Config::load(config_file).ok())
        .unwrap_or_default();
    let json_rpc_url = normalize_to_url_if_moniker(
        app_matches
            .value_of("json_rpc_url")
            .unwrap_or("https://api.devnet.solana.com"),
    );
    println!("RPC Client URL: {}", json_rpc_url);
    let client = RpcClient::new(json_rpc_url);

    let payer = match read_keypair_file(
        app_matches
            .value_of("fee_payer")
            .unwrap_or(&config.keypair_path),
    ) {
        Ok(payer) => payer,
        Err(err) => {
            eprintln!("Unable to read fee payer keypair: {}", err);
            exit(1);
        }
    };

    println!("Payer pubkey: {}", payer.pubkey());

    if let Err(err) = process_command(&client, &payer, &app_matches) {
        eprintln!("Error: {}", err);
        exit(1);
    }

    println!("Completed!");
}
