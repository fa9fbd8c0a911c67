use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use citas_api::{HttpApi, SchedulingApi};
use citas_booking::verification::parse_payload;
use citas_booking::{AvailabilityResolver, BookingSession, CancelError, CancellationService};
use citas_core::identity::RegistrantField;
use citas_core::{ClientConfig, DocumentType, SlotTime};

mod display;

/// Book, list, cancel and verify appointments against a Citas server.
#[derive(Parser)]
#[command(name = "citas")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Client config file (TOML)
    #[arg(short, long, global = true, env = "CITAS_CONFIG")]
    config: Option<PathBuf>,

    /// Scheduling API base URL, used when no config file is given
    #[arg(long, global = true, env = "CITAS_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show bookable times for a branch and date
    Slots {
        #[arg(long)]
        branch: i64,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },

    /// Book an appointment
    Book(BookArgs),

    /// List a client's appointments
    Appointments {
        #[arg(long)]
        client: String,
    },

    /// Cancel an appointment
    Cancel {
        #[arg(long)]
        client: String,
        /// Appointment id
        #[arg(long)]
        appointment: i64,
        #[arg(long, default_value = "")]
        reason: String,
        /// Skip the local lead-time check and let the server decide
        #[arg(long)]
        force: bool,
    },

    /// Check an appointment against the public verification endpoint
    Verify {
        /// Verification URL from a confirmation
        #[arg(conflicts_with_all = ["appointment", "client"])]
        payload: Option<String>,
        #[arg(long, requires = "client")]
        appointment: Option<String>,
        #[arg(long, requires = "appointment")]
        client: Option<String>,
    },

    /// Read a server setting
    Settings { key: String },
}

#[derive(Args)]
struct BookArgs {
    /// Existing client number
    #[arg(long, conflicts_with = "document_number")]
    client: Option<String>,

    #[arg(long, default_value = "CC")]
    document_type: DocumentType,
    #[arg(long, requires_all = ["full_name", "mobile", "email"])]
    document_number: Option<String>,
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,

    /// Appointment type id
    #[arg(long)]
    reason: i64,
    #[arg(long)]
    branch: i64,
    /// Date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,
    /// Time (HH:MM)
    #[arg(long)]
    time: SlotTime,
    #[arg(long)]
    observations: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::debug!("citas v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let api: Arc<dyn SchedulingApi> =
        Arc::new(HttpApi::from_config(&config).context("building HTTP client")?);

    match cli.command {
        Commands::Slots { branch, date } => {
            let resolution = AvailabilityResolver::new(api).resolve(date, branch).await;
            display::print_slots(date, branch, &resolution);
        }
        Commands::Book(args) => book(api, &config, args).await?,
        Commands::Appointments { client } => {
            let service = CancellationService::load(api, &config).await;
            match service.appointments(&client, Local::now().naive_local()).await {
                Ok(rows) => display::print_appointments(&client, &rows, service.policy()),
                Err(d) => {
                    display::print_error(&d);
                    bail!("could not list appointments for {client}");
                }
            }
        }
        Commands::Cancel {
            client,
            appointment,
            reason,
            force,
        } => cancel(api, &config, &client, appointment, &reason, force).await?,
        Commands::Verify {
            payload,
            appointment,
            client,
        } => {
            let (appointment, client) = match (payload, appointment, client) {
                (Some(p), _, _) => parse_payload(&p)
                    .with_context(|| format!("not a verification URL: {p}"))?,
                (None, Some(a), Some(c)) => (a, c),
                _ => bail!("give a verification URL or --appointment and --client"),
            };
            let resp = api
                .verify(&appointment, &client)
                .await
                .map_err(|e| anyhow::anyhow!(e.describe()))
                .context("verification request failed")?;
            display::print_verification(&resp);
        }
        Commands::Settings { key } => match api.setting(&key).await? {
            Some(value) => println!("{key} = {value}"),
            None => println!("{key} is not set"),
        },
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    if let Some(path) = &cli.config {
        return Ok(ClientConfig::load(path)?);
    }
    let Some(url) = &cli.api_url else {
        bail!("no server configured: pass --config or --api-url (or set CITAS_CONFIG / CITAS_API_URL)");
    };
    let config = ClientConfig::with_base_url(url.as_str());
    config.validate()?;
    Ok(config)
}

async fn book(
    api: Arc<dyn SchedulingApi>,
    config: &ClientConfig,
    args: BookArgs,
) -> anyhow::Result<()> {
    let mut session = BookingSession::new(api, config);
    session.start().await?;

    match (&args.client, &args.document_number) {
        (Some(client), _) => {
            if let Err(e) = session.continue_existing(client).await {
                if let Some(d) = e.descriptor() {
                    display::print_error(d);
                }
                bail!("client {client} could not be validated");
            }
        }
        (None, Some(document_number)) => {
            session.select_document_type(args.document_type)?;
            let fields = [
                (RegistrantField::DocumentNumber, Some(document_number)),
                (RegistrantField::FullName, args.full_name.as_ref()),
                (RegistrantField::Mobile, args.mobile.as_ref()),
                (RegistrantField::Email, args.email.as_ref()),
                (RegistrantField::Phone, args.phone.as_ref()),
                (RegistrantField::Address, args.address.as_ref()),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    session.edit_registrant(field, value.as_str())?;
                }
            }
            session.continue_as_new()?;
        }
        (None, None) => bail!("give --client, or --document-number with the registrant details"),
    }

    session.select_reason(args.reason)?;
    session.change_branch(args.branch).await?;
    session.change_date(args.date).await?;
    if let Some(d) = session.current_error() {
        display::print_error(d);
    }
    session
        .select_time(args.time)
        .with_context(|| format!("{} is not bookable on {} at branch {}", args.time, args.date, args.branch))?;
    if let Some(text) = args.observations {
        session.set_observations(text)?;
    }

    match session.submit().await {
        Ok(confirmation) => {
            let confirmation = confirmation.clone();
            display::print_confirmation(&confirmation, session.catalogs());
            Ok(())
        }
        Err(e) => {
            if let Some(d) = e.descriptor() {
                display::print_error(d);
            }
            Err(e).context("booking failed")
        }
    }
}

async fn cancel(
    api: Arc<dyn SchedulingApi>,
    config: &ClientConfig,
    client: &str,
    appointment_id: i64,
    reason: &str,
    force: bool,
) -> anyhow::Result<()> {
    let service = CancellationService::load(api, config).await;
    let result = if force {
        service.force_cancel(client, appointment_id, reason).await
    } else {
        let rows = service
            .appointments(client, Local::now().naive_local())
            .await
            .map_err(|d| anyhow::anyhow!(d))?;
        let Some(row) = rows.into_iter().find(|r| r.appointment.id == appointment_id) else {
            bail!("appointment {appointment_id} not found for client {client}");
        };
        service
            .cancel(client, &row.appointment, reason, Local::now().naive_local())
            .await
    };

    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(CancelError::Rejected(d)) => {
            display::print_error(&d);
            bail!("cancellation rejected")
        }
        Err(e) => Err(e.into()),
    }
}
