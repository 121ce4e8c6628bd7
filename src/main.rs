use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use issuedesk::{
    auth::local::LocalAuth,
    config::{Config, DataDir},
    models::ticket::Status,
    screens::{
        NavigationQueue, Notifier, Route, ScreenContext,
        details::DetailsScreen,
        gate::{AuthGate, TopLevelView},
        home::HomeScreen,
        register::RegisterScreen,
        sign_in::SignInScreen,
    },
    storage::json::JsonFileStorage,
    store::local::LocalStore,
    ui::{self, TerminalNotifier},
};

type FileStore = LocalStore<JsonFileStorage>;

#[derive(Parser)]
#[command(
    name = "issuedesk",
    about = "Track equipment issue tickets from your terminal"
)]
struct Cli {
    /// Directory holding the database, the session and config.json
    #[arg(long, global = true, env = "ISSUEDESK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account e-mail
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    #[command(flatten)]
    App(AppCommands),
}

/// Commands that need a signed-in user
#[derive(Subcommand)]
enum AppCommands {
    /// Sign out
    Logout,

    /// Show who is signed in
    Whoami,

    /// List tickets (in progress by default)
    List {
        #[arg(short, long, value_enum, default_value_t = Status::Open)]
        status: Status,
    },

    /// List tickets and keep the list updated as they change
    Watch {
        #[arg(short, long, value_enum, default_value_t = Status::Open)]
        status: Status,
    },

    /// Show one ticket
    Show { id: String },

    /// Close a ticket in progress
    Close {
        id: String,

        /// How the problem was solved
        #[arg(short, long)]
        solution: String,
    },

    /// Register a new ticket
    New {
        /// Asset tag of the equipment
        #[arg(short, long)]
        patrimony: String,

        /// What is wrong with it
        #[arg(short, long)]
        description: String,
    },
}

/// Log level used when `ISSUEDESK_LOG` is unset or invalid
const DEFAULT_LOG_LEVEL: &str = "warn";

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ISSUEDESK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let data_dir = DataDir::new(cli.data_dir.unwrap_or_else(DataDir::default_root));
    data_dir.ensure_exists().unwrap_or_else(|e| exit_with(e));

    let config = Config::load(data_dir.root()).unwrap_or_else(|e| exit_with(e));
    let formatter = config.formatter().unwrap_or_else(|e| exit_with(e));

    let store = Rc::new(
        LocalStore::open(JsonFileStorage::new(data_dir.database()))
            .unwrap_or_else(|e| exit_with(format!("Failed to load database: {}", e))),
    );
    let auth = Rc::new(LocalAuth::open(data_dir.session()).unwrap_or_else(|e| exit_with(e)));
    let notifier: Rc<dyn Notifier> = Rc::new(TerminalNotifier);
    let navigation = Rc::new(NavigationQueue::default());

    let mut gate = AuthGate::mount(auth.as_ref());
    auth.deliver_pending();

    let command = cli.command.unwrap_or(Commands::App(AppCommands::List {
        status: Status::Open,
    }));

    let command = match command {
        Commands::Login { email, password } => {
            let mut screen = SignInScreen::mount(auth.clone(), notifier.clone());
            screen.set_email(email);
            screen.set_password(password);
            if screen.submit().is_err() {
                std::process::exit(1);
            }
            auth.deliver_pending();
            if let Some(user) = gate.user() {
                println!("Signed in as {}", user.email.bold());
            }
            gate.teardown();
            return;
        }
        Commands::App(command) => command,
    };

    if gate.view() != TopLevelView::App {
        exit_with("Not signed in. Run `issuedesk login <email> --password <password>` first.");
    }

    let ctx = ScreenContext {
        store: store.clone(),
        auth: auth.clone(),
        navigator: navigation.clone(),
        notifier,
        formatter,
        collection: config.collection.clone(),
    };

    match command {
        AppCommands::Logout => {
            let mut home = HomeScreen::mount(ctx);
            if home.logout().is_err() {
                std::process::exit(1);
            }
            home.unmount();
            auth.deliver_pending();
            if gate.view() == TopLevelView::SignIn {
                println!("Signed out");
            }
        }
        AppCommands::Whoami => {
            if let Some(user) = gate.user() {
                println!("{} {}", user.email.bold(), user.uid.dimmed());
            }
        }
        AppCommands::List { status } => show_list(ctx, &store, status),
        AppCommands::Watch { status } => watch_list(ctx, &store, status, &config),
        AppCommands::Show { id } => {
            let mut details = DetailsScreen::mount(ctx, id);
            let loaded = details.load();
            ui::render_details(&details);
            if loaded.is_err() {
                std::process::exit(1);
            }
        }
        AppCommands::Close { id, solution } => {
            let mut details = DetailsScreen::mount(ctx.clone(), id);
            if details.load().is_err() {
                std::process::exit(1);
            }
            details.set_solution(solution);
            if details.close().is_err() {
                std::process::exit(1);
            }
            follow_navigation(&navigation, ctx, &store);
        }
        AppCommands::New {
            patrimony,
            description,
        } => {
            let mut register = RegisterScreen::mount(ctx.clone());
            register.set_patrimony(patrimony);
            register.set_description(description);
            match register.submit() {
                Ok(ticket) => println!("Registered {}", ticket.id.bold()),
                Err(_) => std::process::exit(1),
            }
            follow_navigation(&navigation, ctx, &store);
        }
    }

    gate.teardown();
}

/// Mounts whatever screens the last command asked for
fn follow_navigation(navigation: &NavigationQueue, ctx: ScreenContext, store: &FileStore) {
    for route in navigation.take() {
        match route {
            Route::Home => show_list(ctx.clone(), store, Status::Open),
            Route::Details { .. } | Route::Register => {}
        }
    }
}

fn show_list(ctx: ScreenContext, store: &FileStore, status: Status) {
    let mut home = HomeScreen::mount(ctx);
    home.select_filter(status);
    store.deliver_pending();
    ui::render_home(&home);
    home.unmount();
}

fn watch_list(ctx: ScreenContext, store: &FileStore, status: Status, config: &Config) {
    let mut home = HomeScreen::mount(ctx);
    home.select_filter(status);
    store.deliver_pending();
    ui::render_home(&home);

    loop {
        std::thread::sleep(config.poll_interval());

        if let Err(e) = store.sync() {
            tracing::warn!(error = %e, "failed to refresh tickets");
            continue;
        }
        if store.deliver_pending() > 0 {
            // Clear the screen and move the cursor home before redrawing
            print!("\x1B[2J\x1B[H");
            ui::render_home(&home);
        }
    }
}
