// resume-tailor: command-line driver for the popup session.
// Each subcommand is one popup interaction run against the on-disk store.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use resume_tailor::api::{BackendClient, DocumentFormat, Pagination};
use resume_tailor::config::Config;
use resume_tailor::coordinator::{Coordinator, NavTarget, SystemClock};
use resume_tailor::render::ConsoleRenderer;
use resume_tailor::storage::{FileStore, load_token, record_selection};
use resume_tailor::{Result, logging};

#[derive(Parser)]
#[command(name = "resume-tailor")]
#[command(about = "Tailor your resume to job descriptions")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the popup and show the panel it lands on
    Open,

    /// Record job description text picked from a page
    Select {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out and forget the session
    Logout,

    /// Upload a resume (PDF, DOC, DOCX or TXT, at most 5 MB)
    Upload {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Tailor the active resume to a job description
    Tailor {
        /// Job description text; defaults to the last selection
        #[arg(long)]
        job: Option<String>,

        /// Let the backend rewrite beyond the original resume's facts
        #[arg(long)]
        generate_freely: bool,
    },

    /// Switch to another panel
    Navigate {
        #[arg(value_enum)]
        target: Target,
    },

    /// Print the stored session without changing it
    Status,

    /// List uploaded resumes
    Resumes {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Make a resume the default and the active one
    SetDefault {
        #[arg(value_name = "RESUME_ID")]
        resume_id: String,
    },

    /// Change the name a resume is listed under
    Rename {
        #[arg(value_name = "RESUME_ID")]
        resume_id: String,
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Delete an uploaded resume
    DeleteResume {
        #[arg(value_name = "RESUME_ID")]
        resume_id: String,
    },

    /// List tailored versions
    Versions {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Replace a version's resume with the version
    PromoteVersion {
        #[arg(value_name = "VERSION_ID")]
        version_id: u64,
    },

    /// Delete a tailored version
    DeleteVersion {
        #[arg(value_name = "VERSION_ID")]
        version_id: u64,
    },

    /// Save the last tailoring results as a document
    Download {
        #[arg(long, value_enum, default_value = "pdf")]
        format: Format,

        /// Output file; defaults to tailored-resume.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pdf,
    Docx,
}

impl From<Format> for DocumentFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pdf => DocumentFormat::Pdf,
            Format::Docx => DocumentFormat::Docx,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Ready,
    Upload,
    Tailor,
    Settings,
    NewTailoring,
}

impl From<Target> for NavTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Ready => NavTarget::Ready,
            Target::Upload => NavTarget::Upload,
            Target::Tailor => NavTarget::Tailor,
            Target::Settings => NavTarget::Settings,
            Target::NewTailoring => NavTarget::NewTailoring,
        }
    }
}

type CliCoordinator =
    Coordinator<FileStore, BackendClient, ConsoleRenderer<std::io::Stdout>, SystemClock>;

async fn build() -> Result<CliCoordinator> {
    let config = Config::load()?;
    let store = FileStore::open_default()?;
    let token = load_token(&store).await?;
    let backend = BackendClient::from_config(&config, token)?;

    Ok(Coordinator::new(store, backend, ConsoleRenderer::stdout(), SystemClock)
        .with_policy(config.policy()))
}

fn print_pagination(pagination: Option<Pagination>) {
    if let Some(p) = pagination {
        println!("Page {} of {} ({} total)", p.page, p.total_pages.max(1), p.total);
    }
}

async fn run(command: Commands) -> Result<()> {
    let mut coordinator = build().await?;

    match command {
        Commands::Open => {
            let opened = coordinator.reconcile_on_open().await?;
            if opened.needs_verification() {
                coordinator.verify_credential().await?;
            }
        }
        Commands::Select { text } => {
            record_selection(coordinator.store(), &text).await?;
            println!("Selection saved. Run `resume-tailor open` to tailor.");
        }
        Commands::Login { email, password } => {
            coordinator.login(&email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            coordinator.register(&name, &email, &password).await?;
        }
        Commands::Logout => {
            coordinator.logout().await?;
        }
        Commands::Upload { path } => {
            coordinator.upload_resume(&path).await?;
        }
        Commands::Tailor {
            job,
            generate_freely,
        } => {
            coordinator.tailor(job, generate_freely).await?;
        }
        Commands::Navigate { target } => {
            coordinator.navigate(target.into()).await?;
        }
        Commands::Status => {
            let state = coordinator.snapshot().await?;
            println!("Panel:     {}", state.panel);
            println!("Signed in: {}", if state.has_auth_token { "yes" } else { "no" });
            println!(
                "Resume:    {}",
                state.active_resume_id.as_deref().unwrap_or("none")
            );
            if let Some(op) = &state.long_operation {
                println!("Running:   {} since {}", op.kind, op.started_at);
            }
            if let Some(results) = &state.cached_results {
                println!("Results:   saved {}", results.saved_at);
            }
            if let Some(text) = state.selection() {
                println!("Selection: {} chars", text.len());
            }
        }
        Commands::Resumes { page } => {
            let listing = coordinator.list_resumes(page).await?;
            if listing.items.is_empty() {
                println!("No resumes uploaded yet.");
            }
            for resume in &listing.items {
                let marker = if resume.is_default { " (default)" } else { "" };
                println!(
                    "{:<12} {}{}",
                    resume.id().unwrap_or_default(),
                    resume.label(),
                    marker
                );
            }
            print_pagination(listing.pagination);
        }
        Commands::SetDefault { resume_id } => {
            coordinator.set_default_resume(&resume_id).await?;
            println!("Default resume set.");
        }
        Commands::Rename { resume_id, name } => {
            coordinator.rename_resume(&resume_id, &name).await?;
            println!("Resume renamed.");
        }
        Commands::DeleteResume { resume_id } => {
            coordinator.delete_resume(&resume_id).await?;
            println!("Resume deleted.");
        }
        Commands::Versions { page } => {
            let listing = coordinator.list_versions(page).await?;
            if listing.items.is_empty() {
                println!("No tailored versions yet.");
            }
            for version in &listing.items {
                let marker = if version.is_current { " (current)" } else { "" };
                println!(
                    "{:<8} {} / {}{}",
                    version.version_id,
                    version.resume_name.as_deref().unwrap_or("-"),
                    version.version_name.as_deref().unwrap_or("-"),
                    marker
                );
                if let Some(url) = version.download_url() {
                    println!("         {}", url);
                }
            }
            print_pagination(listing.pagination);
        }
        Commands::PromoteVersion { version_id } => {
            coordinator.promote_version(version_id).await?;
            println!("Version promoted to main resume.");
        }
        Commands::DeleteVersion { version_id } => {
            coordinator.delete_version(version_id).await?;
            println!("Version deleted.");
        }
        Commands::Download { format, output } => {
            let format = DocumentFormat::from(format);
            let bytes = coordinator.download_results(format).await?;
            let output = output
                .unwrap_or_else(|| PathBuf::from(format!("tailored-resume.{}", format.extension())));
            tokio::fs::write(&output, &bytes).await?;
            println!("Saved {} ({} bytes)", output.display(), bytes.len());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
