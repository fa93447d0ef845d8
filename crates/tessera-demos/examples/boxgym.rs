//! Drive the box gym on the headless backend and print the resulting trees.

use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tessera::{
    Button, Config, EventLoop, HeadlessBackend, KeyCode, NativeEvent,
    dump::{dump, dump_plain},
    geom::Point,
};
use tessera_demos::boxgym::BoxGym;
use tracing::info;

/// CLI flags for the box gym example.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Swatch columns.
    #[clap(long, default_value_t = 4)]
    cols: u32,

    /// Swatch rows.
    #[clap(long, default_value_t = 3)]
    rows: u32,

    /// JSON configuration file.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Simulated milliseconds to run for.
    #[clap(long, default_value_t = 500)]
    ms: u64,

    /// Skip the scripted input.
    #[clap(long)]
    idle: bool,

    /// Print the dump without color.
    #[clap(short, long)]
    plain: bool,
}

/// Run the box gym example.
pub fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Config::from_json(&text)?
        }
        None => Config::default(),
    };
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    let mut event_loop = EventLoop::new(backend, config)?;
    let gym = BoxGym::build(event_loop.session_mut(), args.cols, args.rows)?;

    if !args.idle {
        let s = event_loop.session();
        let win = s.window(gym.window).context("gym window")?;
        let (window, frame, position) = (win.native(), win.frame().origin(), win.position());
        let target = gym.center(s, 0).context("first swatch")? + frame;
        let root = target + position;
        info!("scripting input at {target:?}");
        for event in [
            NativeEvent::Enter {
                window,
                pos: target,
                root,
            },
            NativeEvent::ButtonDown {
                window,
                pos: target,
                root,
                button: Button::Primary,
                time: 0,
            },
            NativeEvent::ButtonUp {
                window,
                pos: target,
                root,
                button: Button::Primary,
            },
            NativeEvent::KeyDown {
                window,
                key: KeyCode::Tab.into(),
            },
            NativeEvent::KeyDown {
                window,
                key: ' '.into(),
            },
            NativeEvent::Motion {
                window,
                pos: Point::new(0, 0),
                root: position,
            },
            NativeEvent::Close { window },
        ] {
            probe.post(event);
        }
    }

    event_loop.handle().add_stop(args.ms);
    event_loop.run()?;

    let out = if args.plain {
        dump_plain(event_loop.session())?
    } else {
        dump(event_loop.session())?
    };
    print!("{out}");
    info!(
        "{} native calls, {} windows open",
        probe.calls().len(),
        probe.window_count()
    );
    Ok(())
}
