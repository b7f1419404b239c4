//! Offline run of the array against simulated electrodes.

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use serde_json::json;
use touch_config::{Config, TouchEvent};
use touch_core::{StateChange, TouchArray, TouchError, notify_with};
use touch_hardware::{FileStore, SimulatedElectrode, TouchLevel};
use touch_traits::{ManualClock, SampleMethod};

#[derive(Debug, Clone)]
pub struct SimParams {
    pub cycles: u32,
    pub period_ms: u32,
    pub baseline: i32,
    pub noise: u16,
    pub seed: u32,
    pub script: Option<PathBuf>,
    pub save: bool,
    pub realtime: bool,
}

/// What a finished run reports.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub cycles: u32,
    pub states: Vec<&'static str>,
    pub status: i8,
    pub saved: bool,
}

fn load_script(params: &SimParams, sensors: usize) -> eyre::Result<Vec<TouchEvent>> {
    let Some(path) = &params.script else {
        return Ok(Vec::new());
    };
    let events = touch_config::load_touch_script_csv(path)?;
    if let Some(bad) = events.iter().find(|e| e.sensor >= sensors) {
        eyre::bail!(
            "touch script names sensor {} but only {sensors} are configured",
            bad.sensor
        );
    }
    Ok(events)
}

fn open_store(cfg: &Config) -> eyre::Result<Option<FileStore>> {
    cfg.store
        .image
        .as_ref()
        .map(|path| {
            FileStore::open(path, cfg.store.capacity)
                .wrap_err_with(|| format!("open store image {path}"))
        })
        .transpose()
}

fn print_change(out: &mut dyn Write, json: bool, t_ms: u64, c: &StateChange) -> std::io::Result<()> {
    if json {
        let line = json!({
            "t_ms": t_ms,
            "sensor": c.sensor,
            "old": c.old.label(),
            "new": c.new.label(),
        });
        writeln!(out, "{line}")
    } else {
        writeln!(out, "{t_ms:>8} ms  sensor {}: {} -> {}", c.sensor, c.old, c.new)
    }
}

/// Run the simulation, printing every major state change to `out`.
pub fn run_simulation(
    cfg: &Config,
    params: &SimParams,
    json: bool,
    out: &mut dyn Write,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<SimReport> {
    let sensors = cfg.sensors.len();
    let events = load_script(params, sensors)?;

    let electrodes: Vec<SimulatedElectrode> = (0..sensors)
        .map(|i| {
            let seed = params
                .seed
                .wrapping_add(u32::try_from(i).unwrap_or(u32::MAX));
            SimulatedElectrode::new(params.baseline, params.noise, seed)
        })
        .collect();
    let touches: Vec<TouchLevel> = electrodes.iter().map(SimulatedElectrode::touch).collect();
    let methods: Vec<Box<dyn SampleMethod>> = electrodes
        .into_iter()
        .map(|e| Box::new(e) as Box<dyn SampleMethod>)
        .collect();

    let clock = ManualClock::new();
    let pending: Rc<RefCell<Vec<StateChange>>> = Rc::default();
    let sink = Rc::clone(&pending);
    let mut array: TouchArray = TouchArray::builder()
        .with_clock(Box::new(clock.clone()))
        .with_observer(notify_with(move |c| sink.borrow_mut().push(c)))
        .from_config(cfg, methods)?
        .build()?;

    let mut store = open_store(cfg)?;
    if let Some(store) = &store {
        if cfg.store.load_on_start {
            // Failures are latched on the array; the run continues on defaults.
            if let Err(e) = array.load_settings_from(store, cfg.store.offset) {
                tracing::warn!(error = %e, "using default thresholds");
            }
        }
    }

    tracing::info!(
        sensors,
        cycles = params.cycles,
        period_ms = params.period_ms,
        scan = %array.scan_order(),
        "simulation start"
    );

    let mut next_event = 0;
    let mut ran = 0;
    for k in 1..=params.cycles {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(cycle = k, "stopped by signal");
            break;
        }
        clock.advance(params.period_ms);
        let t_ms = u64::from(k) * u64::from(params.period_ms);
        while let Some(ev) = events.get(next_event) {
            if u64::from(ev.at_ms) > t_ms {
                break;
            }
            touches[ev.sensor].set(ev.level);
            tracing::debug!(t_ms, sensor = ev.sensor, level = ev.level, "touch level");
            next_event += 1;
        }

        let _ = array.run_cycle();
        ran = k;
        for c in pending.borrow_mut().drain(..) {
            print_change(out, json, t_ms, &c)?;
        }

        if params.realtime {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(params.period_ms)));
        }
    }

    let mut saved = false;
    if params.save {
        let Some(store) = store.as_mut() else {
            return Err(eyre::Report::new(TouchError::NoStore));
        };
        array.save_settings_to(store, cfg.store.offset)?;
        store.flush()?;
        saved = true;
    }

    Ok(SimReport {
        cycles: ran,
        states: (0..sensors).map(|ch| array.label(ch)).collect(),
        status: array.error_code(),
        saved,
    })
}

/// Print the end-of-run summary.
pub fn print_report(out: &mut dyn Write, json: bool, r: &SimReport) -> std::io::Result<()> {
    if json {
        let line = json!({
            "cycles": r.cycles,
            "states": r.states,
            "status": r.status,
            "saved": r.saved,
        });
        writeln!(out, "{line}")
    } else {
        let states: Vec<String> = r
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{i}={s}"))
            .collect();
        writeln!(out, "after {} cycles: {}", r.cycles, states.join(" "))?;
        if r.status != 0 {
            writeln!(out, "settings error latched (code {})", r.status)?;
        }
        if r.saved {
            writeln!(out, "settings saved")?;
        }
        Ok(())
    }
}
