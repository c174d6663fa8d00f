//! List the NuttX threads running on a live target.
//!
//! Usage: list_threads <CHIP> <ELF> [TARGET_NAME]
//!
//! TARGET_NAME is the architecture name used for compatibility matching and
//! defaults to "cortex_m".

use anyhow::{bail, Context, Result};
use kestrel_core::{detect_rtos, ElfSymbolFile, FpFeature, TargetDescription};
use probe_rs::probe::list::Lister;
use probe_rs::Permissions;
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let usage = "usage: list_threads <CHIP> <ELF> [TARGET_NAME]";
    let chip = args.next().context(usage)?;
    let elf = args.next().context(usage)?;
    let target_name = args.next().unwrap_or_else(|| "cortex_m".to_string());

    let lister = Lister::new();
    let probes = lister.list_all();
    if probes.is_empty() {
        bail!("No probes found");
    }
    let probe = probes[0].open()?;
    let mut session = probe.attach(chip, Permissions::default())?;

    let resolver = ElfSymbolFile::load(Path::new(&elf))?;
    let Some((mut rtos, symbols)) = detect_rtos(&resolver) else {
        bail!("No supported RTOS signature found in {}", elf);
    };
    println!("Detected {}", rtos.name());

    rtos.create(&TargetDescription::new(target_name, FpFeature::None))?;

    let mut core = session.core(0)?;
    core.halt(Duration::from_millis(100))?;
    rtos.update_threads(&mut core, &symbols)?;

    println!("{} threads:", rtos.threads().len());
    for thread in rtos.threads() {
        let marker = if Some(thread.thread_id) == rtos.current_thread() {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:#010x} {:24} {}",
            marker,
            thread.thread_id,
            thread.name,
            thread.extra_info().unwrap_or_default()
        );
    }

    core.run()?;
    Ok(())
}
