use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{LedClient, Reconstructor, Scene};
use shared::protocol::Frame;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Inspect and steer an LED tree controller")]
struct Cli {
    #[arg(long, env = "LED_CONTROLLER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current frame once.
    State {
        #[arg(long)]
        ascii: bool,
    },
    /// Follow the frame socket and redraw on every frame.
    Watch {
        /// Stop after this many frames.
        #[arg(long)]
        frames: Option<usize>,
    },
    Power {
        state: PowerState,
    },
    Brightness {
        level: u8,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PowerState {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();
    let client = LedClient::new(&cli.server_url)?;

    match cli.command {
        Command::State { ascii } => {
            let frame = client.fetch_state().await?;
            println!("{}", status_line(&frame));
            if ascii {
                let scene = Reconstructor::new()
                    .reconstruct(&frame)
                    .context("cannot draw current frame")?;
                println!("{}", scene.render_ascii());
            }
        }
        Command::Watch { frames } => watch(&client, frames).await?,
        Command::Power { state } => {
            client.set_power(matches!(state, PowerState::On)).await?;
            println!("power {}", if matches!(state, PowerState::On) { "on" } else { "off" });
        }
        Command::Brightness { level } => {
            client.set_brightness(level).await?;
            println!("brightness {level}");
        }
    }

    Ok(())
}

async fn watch(client: &LedClient, limit: Option<usize>) -> Result<()> {
    let mut stream = client.connect().await?;
    let mut reconstructor = Reconstructor::new();
    let mut seen = 0usize;

    while let Some(frame) = stream.next_frame().await? {
        match reconstructor.reconstruct(&frame) {
            Ok(scene) => draw(&frame, &scene),
            Err(err) => warn!("frame not drawn: {err}"),
        }
        seen += 1;
        if limit.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    stream.close().await.ok();
    Ok(())
}

fn draw(frame: &Frame, scene: &Scene) {
    // clear screen, cursor home
    print!("\x1b[2J\x1b[H");
    println!("{}", status_line(frame));
    println!("{}", scene.render_ascii());
}

fn status_line(frame: &Frame) -> String {
    let power = match frame.on {
        Some(true) => "on",
        Some(false) => "off",
        None => "?",
    };
    let brightness = frame
        .b
        .map_or_else(|| "?".to_string(), |level| level.to_string());
    format!(
        "power={power} brightness={brightness} pixels={}",
        frame.colors.len()
    )
}
