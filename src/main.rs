// spacecoin - command-line front end for a persisted crowdsale deployment

use clap::{Parser, Subcommand};
use spacecoin::account::units::{self, Amount};
use spacecoin::account::{Address, AddressError};
use spacecoin::chain::{Chain, ChainError, Contract};
use spacecoin::config::{ChainConfig, ConfigError};
use spacecoin::crowdsale::Stage;
use spacecoin::service::{ChainHandle, ChainService, ServiceError};
use spacecoin::storage::{ChainStore, StoreError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum CliError {
    #[error("no deployment found in {0}; run `spacecoin deploy` first")]
    NotDeployed(PathBuf),

    #[error("a deployment already exists in {0}")]
    AlreadyDeployed(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Parser)]
#[command(name = "spacecoin", version, about = "Staged crowdsale with a transfer-taxed token")]
struct Cli {
    /// Directory holding the persisted deployment
    #[arg(long, global = true, default_value = ".spacecoin")]
    data_dir: PathBuf,

    /// TOML deployment config (used by `deploy` and `config`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy the token and crowdsale and distribute the initial supply
    Deploy {
        #[arg(long, value_parser = parse_account)]
        deployer: Address,
        #[arg(long, value_parser = parse_account)]
        treasury: Address,
        /// Accounts allowed to contribute during the seed stage
        #[arg(long, value_parser = parse_account, value_delimiter = ',')]
        whitelist: Vec<Address>,
    },
    /// Issue native currency to an account
    Fund {
        #[arg(long, value_parser = parse_account)]
        to: Address,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Contribute native currency to the crowdsale
    Buy {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long, value_parser = parse_amount)]
        value: Amount,
    },
    /// Redeem contributions for tokens (open stage only)
    Claim {
        #[arg(long, value_parser = parse_account)]
        from: Address,
    },
    /// Withdraw raised funds to the crowdsale owner
    Withdraw {
        #[arg(long, value_parser = parse_account)]
        from: Address,
    },
    /// Add accounts to the seed whitelist
    Whitelist {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long, value_parser = parse_account, value_delimiter = ',', required = true)]
        add: Vec<Address>,
    },
    /// Move the crowdsale to a later stage
    Advance {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long)]
        stage: Stage,
    },
    /// Pause or resume contributions
    ToggleFunding {
        #[arg(long, value_parser = parse_account)]
        from: Address,
    },
    /// Enable or disable the transfer tax
    ToggleTax {
        #[arg(long, value_parser = parse_account)]
        from: Address,
    },
    /// Transfer tokens
    Transfer {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long, value_parser = parse_account)]
        to: Address,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Allow a spender to move tokens on your behalf
    Approve {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long, value_parser = parse_account)]
        spender: Address,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Move another account's tokens using an allowance
    TransferFrom {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long, value_parser = parse_account)]
        owner: Address,
        #[arg(long, value_parser = parse_account)]
        to: Address,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Hand a contract to a new owner
    TransferOwnership {
        #[arg(long, value_parser = parse_account)]
        from: Address,
        #[arg(long)]
        contract: Contract,
        #[arg(long, value_parser = parse_account)]
        new_owner: Address,
    },
    /// Show the crowdsale and token state
    Status,
    /// Show an account's balances and contribution
    Balance {
        #[arg(long, value_parser = parse_account)]
        of: Address,
    },
    /// Print the event log
    Events {
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
    /// Print the effective deployment config as TOML
    Config,
}

/// Accept a 0x-prefixed hex address or a label
fn parse_account(s: &str) -> Result<Address, AddressError> {
    if s.starts_with("0x") || s.starts_with("0X") {
        Address::parse(s)
    } else {
        Ok(Address::from_label(s))
    }
}

fn parse_amount(s: &str) -> Result<Amount, units::UnitsError> {
    units::parse_units(s)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spacecoin=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let store = ChainStore::open(&cli.data_dir)?;

    match cli.command {
        Command::Deploy {
            deployer,
            treasury,
            whitelist,
        } => {
            if store.has_chain()? {
                return Err(CliError::AlreadyDeployed(cli.data_dir));
            }

            let config = resolve_config(cli.config.as_deref(), &store)?;
            let chain = Chain::deploy(deployer, treasury, whitelist, &config)?;

            store.save_config(&config)?;
            store.save_chain(&chain)?;
            store.flush()?;

            println!("token:     {}", chain.token_address());
            println!("crowdsale: {}", chain.crowdsale_address());
            println!("treasury:  {}", chain.token().treasury());
            Ok(())
        }
        Command::Config => {
            let config = resolve_config(cli.config.as_deref(), &store)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        command => {
            let chain = store
                .load_chain()?
                .ok_or_else(|| CliError::NotDeployed(cli.data_dir.clone()))?;

            let handle = ChainService::spawn(chain, Some(store));
            let result = execute(&handle, command).await;
            handle.shutdown().await?;
            result
        }
    }
}

/// Config file beats the stored deployment config, which beats the defaults
fn resolve_config(path: Option<&Path>, store: &ChainStore) -> Result<ChainConfig, CliError> {
    if let Some(path) = path {
        info!(path = %path.display(), "loading config file");
        return Ok(ChainConfig::load(path)?);
    }
    Ok(store.load_config()?.unwrap_or_default())
}

async fn execute(handle: &ChainHandle, command: Command) -> Result<(), CliError> {
    match command {
        Command::Fund { to, amount } => {
            let balance = handle.fund(to, amount).await?;
            println!("{} native balance: {}", to, units::format_units(balance));
        }
        Command::Buy { from, value } => {
            let contributed = handle.buy_tokens(from, value).await?;
            println!("{} total contribution: {}", from, units::format_units(contributed));
        }
        Command::Claim { from } => {
            let claim = handle.claim_token(from).await?;
            println!(
                "{} claimed {} tokens ({} received, {} tax)",
                from,
                units::format_units(claim.tokens),
                units::format_units(claim.split.to_recipient),
                units::format_units(claim.split.to_treasury)
            );
        }
        Command::Withdraw { from } => {
            let amount = handle.withdraw_funds(from).await?;
            println!("withdrew {} to {}", units::format_units(amount), from);
        }
        Command::Whitelist { from, add } => {
            let added = handle
                .mutate(move |chain| chain.add_to_whitelist(from, &add))
                .await?;
            println!("whitelisted {} new account(s)", added);
        }
        Command::Advance { from, stage } => {
            handle.advance_stage(from, stage).await?;
            println!("stage: {}", stage);
        }
        Command::ToggleFunding { from } => {
            let active = handle
                .mutate(move |chain| chain.toggle_funding_state(from))
                .await?;
            println!("funding active: {}", active);
        }
        Command::ToggleTax { from } => {
            let enabled = handle.mutate(move |chain| chain.toggle_take_fee(from)).await?;
            println!("transfer tax enabled: {}", enabled);
        }
        Command::Transfer { from, to, amount } => {
            let split = handle.transfer(from, to, amount).await?;
            println!(
                "sent {} to {} ({} tax)",
                units::format_units(split.to_recipient),
                to,
                units::format_units(split.to_treasury)
            );
        }
        Command::Approve { from, spender, amount } => {
            handle
                .mutate(move |chain| chain.approve(from, spender, amount))
                .await?;
            println!("{} may spend {} of {}'s tokens", spender, units::format_units(amount), from);
        }
        Command::TransferFrom { from, owner, to, amount } => {
            let split = handle
                .mutate(move |chain| chain.transfer_from(from, owner, to, amount))
                .await?;
            println!(
                "sent {} from {} to {} ({} tax)",
                units::format_units(split.to_recipient),
                owner,
                to,
                units::format_units(split.to_treasury)
            );
        }
        Command::TransferOwnership {
            from,
            contract,
            new_owner,
        } => {
            handle
                .mutate(move |chain| chain.transfer_ownership(from, contract, new_owner))
                .await?;
            println!("{} owner: {}", contract, new_owner);
        }
        Command::Status => {
            let status = handle.query(render_status).await?;
            print!("{}", status);
        }
        Command::Balance { of } => {
            let report = handle
                .query(move |chain| {
                    let sale = chain.crowdsale();
                    format!(
                        "account:      {}\nnative:       {}\ntokens:       {}\ncontributed:  {}\nclaimable:    {}\nwhitelisted:  {}\n",
                        of,
                        units::format_units(chain.native_balance(&of)),
                        units::format_units(chain.token_balance(&of)),
                        units::format_units(sale.contributions(&of)),
                        units::format_units(sale.claimable(&of)),
                        sale.is_whitelisted(&of)
                    )
                })
                .await?;
            print!("{}", report);
        }
        Command::Events { since } => {
            let lines = handle
                .query(move |chain| {
                    chain
                        .events_since(since)
                        .iter()
                        .map(|record| format!("#{:<5} {}", record.seq, record.event))
                        .collect::<Vec<_>>()
                })
                .await?;
            for line in lines {
                println!("{}", line);
            }
        }
        Command::Deploy { .. } | Command::Config => unreachable!("handled before the service starts"),
    }

    Ok(())
}

fn render_status(chain: &Chain) -> String {
    let sale = chain.crowdsale();
    let token = chain.token();
    format!(
        "stage:            {}\n\
         funding active:   {}\n\
         rate:             {} SPC per unit\n\
         total raised:     {}\n\
         withdrawable:     {}\n\
         crowdsale owner:  {}\n\
         token:            {} ({})\n\
         total supply:     {}\n\
         holders:          {}\n\
         sale allocation:  {}\n\
         treasury:         {}\n\
         tax enabled:      {} ({} bps)\n",
        sale.stage(),
        sale.is_ico_active(),
        sale.config().tokens_per_unit,
        units::format_units(sale.total_raised()),
        units::format_units(sale.available_funds_to_withdraw()),
        sale.owner(),
        token.name(),
        token.symbol(),
        units::format_units(token.total_supply()),
        token.holder_count(),
        units::format_units(token.balance_of(&sale.address())),
        token.treasury(),
        token.is_tax_enabled(),
        token.tax_rate_bps()
    )
}
