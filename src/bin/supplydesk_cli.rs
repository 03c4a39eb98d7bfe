use std::{fs, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use supplydesk::{
    clients::{ContractGateway, HttpGateway, QuoteGateway},
    config::{self, AppConfig},
    models::{Contract, Order, Quote, QuoteInput, QuoteStatus},
    notifications::{MemoryNotifier, NoticeLevel},
    services::{
        contracts::{active_contracts, attach_quotes},
        fulfillment::FulfillmentDashboard,
        pricing::{self, QuoteTotals},
        quote_editor::QuoteEditor,
        quote_tracker::{QuoteTracker, StatusFilter},
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(cli.backend.clone())?;

    let result = match cli.command {
        Commands::Orders(command) => handle_orders_command(&context, command, cli.json).await,
        Commands::Quotes(command) => handle_quotes_command(&context, command, cli.json).await,
        Commands::Contracts(command) => {
            handle_contracts_command(&context, command, cli.json).await
        }
    };

    if !cli.json {
        context.print_notices();
    }
    result
}

#[derive(Parser)]
#[command(
    name = "supplydesk",
    about = "Supplydesk CLI for quotes, orders and service contracts",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        help = "Backend base URL (overrides APP__BACKEND_URL and config files)"
    )]
    backend: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Orders(OrdersCommands),
    #[command(subcommand)]
    Quotes(QuotesCommands),
    #[command(subcommand)]
    Contracts(ContractsCommands),
}

#[derive(Subcommand)]
enum OrdersCommands {
    /// Show the new-orders and delivered lists
    Dashboard,
    /// Flag items as shipped and save the order
    Ship(ShipOrderArgs),
}

#[derive(Subcommand)]
enum QuotesCommands {
    List(ListQuotesArgs),
    Show(QuoteRefArgs),
    Status(QuoteStatusArgs),
    /// Create a draft quote
    New(NewQuoteArgs),
    /// Recompute totals for a quote file without contacting the backend
    Totals(QuoteTotalsArgs),
}

#[derive(Subcommand)]
enum ContractsCommands {
    List(ListContractsArgs),
}

#[derive(Args)]
struct ShipOrderArgs {
    #[arg(help = "Order id (UUID) or order number, e.g. ORD-1001")]
    order: String,
    #[arg(
        long = "item",
        action = ArgAction::Append,
        value_parser = clap::value_parser!(Uuid),
        help = "Item id to toggle; repeat for several items"
    )]
    items: Vec<Uuid>,
    #[arg(long, action = ArgAction::SetTrue, help = "Flag every item as shipped")]
    all: bool,
}

#[derive(Args)]
struct ListQuotesArgs {
    #[arg(long, default_value = "all", help = "Status filter (draft, sent, accepted, rejected, expired or all)")]
    status: String,
    #[arg(long, default_value = "", help = "Match against quote number or customer name")]
    query: String,
}

#[derive(Args)]
struct QuoteRefArgs {
    #[arg(help = "Quote id (UUID) or quote number, e.g. Q-2024-001")]
    quote: String,
}

#[derive(Args)]
struct QuoteStatusArgs {
    #[arg(help = "Quote id (UUID) or quote number")]
    quote: String,
    #[arg(value_parser = parse_quote_status, help = "New status")]
    status: QuoteStatus,
}

#[derive(Args)]
struct NewQuoteArgs {
    #[arg(long, help = "Customer name")]
    customer: String,
    #[arg(long, help = "Customer email")]
    email: Option<String>,
    #[arg(long, help = "Customer company")]
    company: Option<String>,
    #[arg(long, help = "Valid-until date (YYYY-MM-DD)")]
    valid_until: Option<String>,
    #[arg(long, value_parser = parse_decimal, help = "Tax rate percentage; defaults to the configured rate")]
    tax_rate: Option<Decimal>,
    #[arg(
        long = "item",
        value_parser = parse_line_item,
        action = ArgAction::Append,
        help = "Line in key=value pairs (e.g. description=Toner,quantity=2,price=89.99)"
    )]
    items: Vec<LineArg>,
    #[arg(long, help = "Free-form notes")]
    notes: Option<String>,
}

#[derive(Args)]
struct QuoteTotalsArgs {
    #[arg(long, help = "Path to a quote JSON file")]
    file: PathBuf,
}

#[derive(Args)]
struct ListContractsArgs {
    #[arg(long, action = ArgAction::SetTrue, help = "Only show active contracts")]
    active: bool,
}

#[derive(Clone, Debug)]
struct LineArg {
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
}

struct CliContext {
    config: AppConfig,
    gateway: Arc<HttpGateway>,
    notifier: Arc<MemoryNotifier>,
}

impl CliContext {
    fn initialize(backend: Option<String>) -> Result<Self> {
        let mut config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);
        if let Some(url) = backend {
            config.backend_url = url;
        }

        let gateway = HttpGateway::new(config.backend_url.clone(), config.request_timeout())
            .context("failed to build backend client")?;

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
            notifier: Arc::new(MemoryNotifier::new()),
        })
    }

    fn dashboard(&self) -> FulfillmentDashboard {
        FulfillmentDashboard::with_config(
            self.gateway.clone(),
            self.notifier.clone(),
            &self.config.fulfillment,
        )
    }

    fn tracker(&self) -> QuoteTracker {
        QuoteTracker::new(self.gateway.clone(), self.notifier.clone())
    }

    fn print_notices(&self) {
        for notice in self.notifier.drain() {
            match notice.level {
                NoticeLevel::Error => eprintln!("[{}] {}", notice.level, notice.message),
                _ => println!("[{}] {}", notice.level, notice.message),
            }
        }
    }
}

async fn handle_orders_command(
    context: &CliContext,
    command: OrdersCommands,
    json: bool,
) -> Result<()> {
    let dashboard = context.dashboard();
    dashboard.refresh().await.context("failed to load orders")?;

    match command {
        OrdersCommands::Dashboard => {
            let partition = dashboard.partition().await;
            if json {
                print_json(&partition)?;
            } else {
                println!("New orders ({})", partition.new_orders.len());
                partition.new_orders.iter().for_each(render_order);
                println!("Delivered ({})", partition.delivered.len());
                partition.delivered.iter().for_each(render_order);
                if !partition.untracked.is_empty() {
                    println!("({} orders in other states not shown)", partition.untracked.len());
                }
            }
            Ok(())
        }
        OrdersCommands::Ship(args) => {
            let order = match Uuid::from_str(&args.order) {
                Ok(id) => dashboard.order(id).await,
                Err(_) => dashboard.find_by_number(&args.order).await,
            }
            .ok_or_else(|| anyhow!("order {} not found", args.order))?;

            if !args.all && args.items.is_empty() {
                bail!("pass --item <id> or --all to choose what shipped");
            }
            if args.all {
                dashboard.mark_all_shipped(order.id).await?;
            }
            for item_id in &args.items {
                dashboard.toggle_item(order.id, *item_id).await?;
            }

            let outcome = dashboard
                .commit(order.id)
                .await
                .with_context(|| format!("failed to save order {}", order.order_number))?;
            if json {
                print_json(&outcome)?;
            } else {
                println!(
                    "Order {}: {} -> {}",
                    outcome.order_number, outcome.previous, outcome.status
                );
            }
            Ok(())
        }
    }
}

async fn handle_quotes_command(
    context: &CliContext,
    command: QuotesCommands,
    json: bool,
) -> Result<()> {
    match command {
        QuotesCommands::List(args) => {
            let mut tracker = context.tracker();
            tracker.refresh().await.context("failed to load quotes")?;
            tracker.set_status_filter(args.status.parse::<StatusFilter>()?);
            tracker.set_query(args.query);

            let visible = tracker.visible();
            if json {
                print_json(&visible)?;
            } else {
                let counts = tracker.status_counts();
                let summary: Vec<String> =
                    counts.iter().map(|(status, n)| format!("{} {}", n, status)).collect();
                println!("Quotes: {} ({})", tracker.quotes().len(), summary.join(", "));
                visible.into_iter().for_each(render_quote);
            }
            Ok(())
        }
        QuotesCommands::Show(args) => {
            let quote = resolve_quote(context, &args.quote).await?;
            if json {
                print_json(&quote)?;
            } else {
                render_quote_detail(&quote);
            }
            Ok(())
        }
        QuotesCommands::Status(args) => {
            let quote = resolve_quote(context, &args.quote).await?;
            let mut tracker = context.tracker();
            tracker.refresh().await.context("failed to load quotes")?;
            let updated = tracker
                .change_status(quote.id, args.status)
                .await
                .with_context(|| format!("failed to update quote {}", quote.quote_number))?;
            if json {
                print_json(&updated)?;
            } else {
                render_quote(&updated);
            }
            Ok(())
        }
        QuotesCommands::New(args) => {
            let mut editor = QuoteEditor::new(
                context.config.pricing.policy(),
                context.config.pricing.default_tax_rate(),
            );
            editor.set_customer_name(args.customer);
            editor.set_customer_email(args.email);
            editor.set_customer_company(args.company);
            editor.set_notes(args.notes);
            if let Some(raw) = args.valid_until {
                editor.set_valid_until(&raw)?;
            }
            if let Some(rate) = args.tax_rate {
                editor.set_tax_rate(rate)?;
            }
            for line in args.items {
                editor.add_item(line.description, line.quantity, line.unit_price)?;
            }

            let saved = editor
                .save(context.gateway.as_ref(), context.notifier.as_ref())
                .await
                .context("failed to save quote")?;
            if json {
                print_json(&saved)?;
            } else {
                render_quote_detail(&saved);
            }
            Ok(())
        }
        QuotesCommands::Totals(args) => {
            let raw = fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let input: QuoteInput = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid quote", args.file.display()))?;
            let totals = offline_totals(&context.config, &input)?;
            if json {
                print_json(&totals)?;
            } else {
                let currency = &context.config.pricing.currency;
                println!("Subtotal: {} {}", totals.subtotal, currency);
                println!("Tax ({}%): {} {}", input.tax_rate, totals.tax_amount, currency);
                println!("Total: {} {}", totals.total, currency);
            }
            Ok(())
        }
    }
}

async fn handle_contracts_command(
    context: &CliContext,
    command: ContractsCommands,
    json: bool,
) -> Result<()> {
    match command {
        ContractsCommands::List(args) => {
            let contracts = context
                .gateway
                .list_contracts()
                .await
                .context("failed to load contracts")?;
            let quotes = context
                .gateway
                .list_quotes()
                .await
                .context("failed to load quotes")?;

            let selected: Vec<Contract> = if args.active {
                active_contracts(&contracts).into_iter().cloned().collect()
            } else {
                contracts
            };
            let summaries = attach_quotes(&selected, &quotes);
            if json {
                print_json(&summaries)?;
            } else {
                for summary in &summaries {
                    let contract = &summary.contract;
                    println!(
                        "- {} • {} • {} • quote {}",
                        contract.contract_number,
                        contract.customer_name,
                        contract.status,
                        summary.quote_number().unwrap_or("unknown")
                    );
                }
            }
            Ok(())
        }
    }
}

async fn resolve_quote(context: &CliContext, reference: &str) -> Result<Quote> {
    if let Ok(id) = Uuid::from_str(reference) {
        return context
            .gateway
            .get_quote(id)
            .await
            .with_context(|| format!("failed to fetch quote {}", id));
    }
    context
        .gateway
        .list_quotes()
        .await
        .context("failed to load quotes")?
        .into_iter()
        .find(|q| q.quote_number.eq_ignore_ascii_case(reference))
        .ok_or_else(|| anyhow!("quote {} not found", reference))
}

fn offline_totals(config: &AppConfig, input: &QuoteInput) -> Result<QuoteTotals> {
    input.validate_input()?;
    pricing::check_tax_rate(input.tax_rate)?;
    let policy = config.pricing.policy();
    let items: Vec<_> = input.items.iter().cloned().map(Into::into).collect();
    Ok(pricing::compute_totals(&items, input.tax_rate, &policy))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_order(order: &Order) {
    let shipped = order.items.iter().filter(|item| item.is_shipped).count();
    println!(
        "- Order {} • {} • {} • {} • {}/{} items shipped",
        order.order_number,
        order.customer_name,
        order.order_date,
        order.status,
        shipped,
        order.items.len()
    );
    for item in &order.items {
        println!(
            "    [{}] {} x{} ({})",
            if item.is_shipped { "x" } else { " " },
            item.product_name,
            item.quantity,
            item.id
        );
    }
}

fn render_quote(quote: &Quote) {
    println!(
        "- Quote {} • {} • {} • total {}",
        quote.quote_number, quote.customer_name, quote.status, quote.total
    );
}

fn render_quote_detail(quote: &Quote) {
    render_quote(quote);
    println!("  Issued {}", quote.issue_date);
    if let Some(valid_until) = quote.valid_until {
        println!("  Valid until {}", valid_until);
    }
    for item in &quote.items {
        println!(
            "    {} x {} @ {} = {}",
            item.description,
            item.quantity,
            item.unit_price,
            item.total()
        );
    }
    println!(
        "  Subtotal {} • Tax {}% {} • Total {}",
        quote.subtotal, quote.tax_rate, quote.tax_amount, quote.total
    );
}

fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|_| format!("invalid decimal '{raw}'"))
}

fn parse_quote_status(raw: &str) -> Result<QuoteStatus, String> {
    QuoteStatus::from_str(raw).map_err(|_| format!("unknown quote status '{raw}'"))
}

fn parse_line_item(raw: &str) -> Result<LineArg, String> {
    let mut description = None;
    let mut quantity = Decimal::ONE;
    let mut unit_price = None;

    for pair in raw.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
        match key.trim() {
            "description" | "desc" => description = Some(value.trim().to_string()),
            "quantity" | "qty" => quantity = parse_decimal(value.trim())?,
            "price" | "unit_price" => unit_price = Some(parse_decimal(value.trim())?),
            other => return Err(format!("unknown item field '{other}'")),
        }
    }

    Ok(LineArg {
        description: description.ok_or("item needs a description")?,
        quantity,
        unit_price: unit_price.ok_or("item needs a price")?,
    })
}
