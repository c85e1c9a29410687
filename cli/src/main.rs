use anyhow::Context;
use clap::{Parser, Subcommand};
use golddrive_core::{
    Drive, DriveLabelAdapter, DriveLetter, DriveStatus, DriveStatusProbe, GoldDriveConfig, MountOrchestrator,
    Settings, SettingsStore,
};
use golddrive_platform::{PlatformDriveTable, PlatformLabels, PlatformTransport};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "golddrive")]
#[command(about = "Map SSH hosts to Windows drive letters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the status of a drive letter
    Status {
        letter: DriveLetter,
        /// Mount point to check against (defaults to the configured one)
        mount_point: Option<String>,
    },
    /// Mount a host on a drive letter
    Mount {
        letter: DriveLetter,
        /// [user@]host[!port][/path] (defaults to the configured one)
        mount_point: Option<String>,
    },
    /// Unmount a drive letter
    Unmount { letter: DriveLetter },
    /// List drive letters free for mounting
    Free,
    /// List drive letters already in use
    Used,
    /// List configured drives
    List,
    /// Add or replace a configured drive
    Add {
        letter: DriveLetter,
        mount_point: String,
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Remove a configured drive
    Remove { letter: DriveLetter },
    /// Show or change the Explorer label of a mounted drive
    Label {
        letter: DriveLetter,
        new_label: Option<String>,
    },
}

struct App {
    store: SettingsStore,
    orchestrator: MountOrchestrator,
    labels: DriveLabelAdapter,
}

impl App {
    fn new(config: &GoldDriveConfig) -> anyhow::Result<Self> {
        let probe = DriveStatusProbe::new(Arc::new(PlatformDriveTable), config.letter_policy());
        let orchestrator =
            MountOrchestrator::new(probe.clone(), Arc::new(PlatformTransport)).with_timeout(config.transport_timeout());
        let labels = DriveLabelAdapter::new(probe, Arc::new(PlatformLabels));
        let store = config.settings_store()?;
        tracing::debug!("settings at {}", store.path().display());

        Ok(Self {
            store,
            orchestrator,
            labels,
        })
    }

    fn settings(&self) -> anyhow::Result<Settings> {
        self.store
            .load()
            .with_context(|| format!("loading {}", self.store.path().display()))
    }

    /// The drive to act on: explicit mount point, then configuration, then
    /// whatever managed mount is live on the letter.
    async fn resolve(&self, letter: DriveLetter, mount_point: Option<String>) -> anyhow::Result<Drive> {
        let settings = self.settings()?;
        let configured = settings.drive(letter).cloned();

        if let Some(mount_point) = mount_point {
            let drive = Drive::new(letter, mount_point);
            return Ok(match configured {
                Some(c) if c.mount_point == drive.mount_point => c,
                _ => drive,
            });
        }
        if let Some(drive) = configured {
            return Ok(drive);
        }

        let used = self.orchestrator.used_drives().await?;
        used.into_iter()
            .find(|d| d.letter() == letter && !d.mount_point.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No mount point given or configured for {}", letter))
    }
}

/// Turn a status refusal into an error so the process exits non-zero.
fn expect_status(drive: &Drive, status: DriveStatus, wanted: DriveStatus, action: &str) -> anyhow::Result<()> {
    if status != wanted {
        anyhow::bail!("{}: {} is {}", action, drive.name(), status);
    }
    Ok(())
}

fn print_drives(drives: &[Drive]) {
    for drive in drives {
        if drive.mount_point.is_empty() {
            println!("  {}  {}", drive.name(), drive.status);
        } else {
            println!("  {}  {:<18} {}", drive.name(), drive.status.to_string(), drive.mount_point);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GoldDriveConfig::from_env()?;
    let app = App::new(&config)?;

    match cli.command {
        Commands::Status { letter, mount_point } => {
            let mut drive = match mount_point {
                Some(mount_point) => Drive::new(letter, mount_point),
                None => app
                    .settings()?
                    .drive(letter)
                    .cloned()
                    .unwrap_or_else(|| Drive::letter_only(letter)),
            };
            let status = app.orchestrator.check_status(&mut drive).await?;
            println!("{} {}", drive.name(), status);
        }
        Commands::Mount { letter, mount_point } => {
            let mut drive = app.resolve(letter, mount_point).await?;
            let status = app.orchestrator.connect(&mut drive).await?;
            expect_status(&drive, status, DriveStatus::Connected, "Not mounted")?;
            println!("{} connected to {}", drive.name(), drive.mount_point);
        }
        Commands::Unmount { letter } => {
            let mut drive = app.resolve(letter, None).await?;
            let status = app.orchestrator.unmount(&mut drive).await?;
            println!("{} {}", drive.name(), status);
        }
        Commands::Free => {
            let drives = app.orchestrator.free_drives().await?;
            if drives.is_empty() {
                println!("No free drive letters.");
            } else {
                println!("Free drive letters:\n");
                print_drives(&drives);
            }
        }
        Commands::Used => {
            let drives = app.orchestrator.used_drives().await?;
            if drives.is_empty() {
                println!("No drive letters in use.");
            } else {
                println!("Used drive letters:\n");
                print_drives(&drives);
            }
        }
        Commands::List => {
            let settings = app.settings()?;
            if settings.is_empty() {
                println!("No drives configured.");
            } else {
                println!("Configured drives:\n");
                for drive in settings.drives() {
                    let status = app.orchestrator.probe().status(drive).await?;
                    println!("Drive: {}", drive.name());
                    println!("  Mount point: {}", drive.mount_point);
                    println!("  Label: {}", drive.label);
                    println!("  Status: {}", status);
                    println!();
                }
            }
        }
        Commands::Add {
            letter,
            mount_point,
            label,
        } => {
            // Rejects malformed mount points before anything is written.
            golddrive_core::MountPoint::parse(&mount_point)?;
            let mut drive = Drive::new(letter, mount_point);
            if let Some(label) = label {
                drive.label = label;
            }

            let mut settings = app.settings()?;
            settings.add_drive(drive.clone());
            app.store.save(&settings)?;
            println!("Added {} -> {}", drive.name(), drive.mount_point);
        }
        Commands::Remove { letter } => {
            let mut settings = app.settings()?;
            match settings.remove_drive(letter) {
                Some(drive) => {
                    app.store.save(&settings)?;
                    println!("Removed {} ({})", drive.name(), drive.mount_point);
                }
                None => anyhow::bail!("{} is not configured", letter),
            }
        }
        Commands::Label { letter, new_label } => {
            let mut drive = app.resolve(letter, None).await?;
            match new_label {
                None => match app.labels.get_label(&drive).await? {
                    Some(label) => println!("{} {}", drive.name(), label),
                    None => anyhow::bail!("{} is not connected", drive.name()),
                },
                Some(new_label) => {
                    let status = app.labels.set_label(&mut drive, &new_label).await?;
                    expect_status(&drive, status, DriveStatus::Connected, "Label not changed")?;

                    let mut settings = app.settings()?;
                    if let Some(configured) = settings.drive_mut(letter) {
                        configured.label = drive.label.clone();
                        app.store.save(&settings)?;
                    }
                    println!("{} labelled '{}'", drive.name(), drive.label);
                }
            }
        }
    }

    Ok(())
}
