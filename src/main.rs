// main.rs - Terminal front-end for the boot sequence

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use punkboot::audio::AssetSet;
use punkboot::config::Options;
use punkboot::engine::BootSequence;
use punkboot::{logging, Cli};

/// Render poll interval; reveals land on scheduler ticks, the terminal
/// only needs to catch up.
const POLL_INTERVAL: Duration = Duration::from_millis(33);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = logging::init(cli.log_level()?);

    let options = cli.merge_into_options(Options::default())?;
    let muted = options.muted;

    let assets = match options.asset_dir.as_deref() {
        Some(dir) => AssetSet::load_dir(dir),
        None => AssetSet::new(),
    };
    if !assets.is_empty() {
        log::info!("loaded {} audio asset(s)", assets.len());
    }

    let mut seq = BootSequence::with_default_lines(options);
    let lines = seq.lines().to_vec();
    let reveal = seq.reveal();

    println!();
    println!("PUNKHAZARD BIOS");
    println!();
    if !muted {
        println!("(press enter to enable audio)");
        println!();
    }

    seq.activate(assets);

    // Every stdin line is a gesture: the first unlocks audio, the next
    // one after the return affordance appears ends the session.
    let (gesture_tx, gesture_rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || gesture_tx.send(()).is_err() {
                break;
            }
        }
    });

    let mut out = io::stdout().lock();
    let mut line_idx = 0;
    let mut printed_main = false;
    let mut printed_dots = 0;
    let mut prompt_shown = false;
    let mut return_note_shown = false;
    let mut unlocked = false;

    'session: loop {
        while gesture_rx.try_recv().is_ok() {
            if !unlocked {
                seq.unlock();
                unlocked = true;
            } else if seq.return_ready() {
                break 'session;
            }
        }

        while line_idx < lines.len() {
            let line = &lines[line_idx];

            if !printed_main {
                if !reveal.main_revealed(line_idx) {
                    break;
                }
                write!(out, "{}", line.main_text)?;
                out.flush()?;
                printed_main = true;
            }

            if line.has_status_token {
                let dots = reveal.dots_revealed(line_idx);
                while printed_dots < dots {
                    write!(out, ".")?;
                    printed_dots += 1;
                }
                out.flush()?;
                if !reveal.status_revealed(line_idx) {
                    break;
                }
                writeln!(out, "OK")?;
            } else {
                writeln!(out)?;
            }

            line_idx += 1;
            printed_main = false;
            printed_dots = 0;
        }

        if !prompt_shown && reveal.prompt_visible() {
            writeln!(out)?;
            write!(out, "root@punkhazard:~$ ")?;
            out.flush()?;
            prompt_shown = true;
        }

        if !return_note_shown && seq.return_ready() {
            writeln!(out)?;
            writeln!(out, "(press enter to return)")?;
            return_note_shown = true;
        }

        thread::sleep(POLL_INTERVAL);
    }

    seq.deactivate();
    writeln!(out)?;
    Ok(())
}
