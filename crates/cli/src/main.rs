use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;
use trackqubo::api::{draw_event, Config, EventToken, Model, SynthCfg, DEFAULT_MIN_HITS_PER_TRACK};

mod dump;
mod io;
mod provenance;

use provenance::Payload;

#[derive(Parser)]
#[command(name = "trackqubo")]
#[command(about = "Build track-finding QUBOs from hits and doublets")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

/// Model configuration: preset, optional JSON file, then `key=value` overrides.
#[derive(Args)]
struct ModelArgs {
    /// base, mp, dj, d0 or all
    #[arg(long, default_value = "base")]
    preset: String,
    /// JSON config file; replaces the preset
    #[arg(long)]
    config: Option<PathBuf>,
    /// Parameter override, e.g. `-e conflict_strength=0.5`
    #[arg(short = 'e', long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

impl ModelArgs {
    fn resolve(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Config::preset(&self.preset)?,
        };
        for kv in &self.set {
            let Some((k, v)) = kv.split_once('=') else {
                bail!("override `{kv}` is not KEY=VALUE");
            };
            cfg.set(k.trim(), v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args)]
struct EventArgs {
    /// Hit table (CSV: hit_id,x,y,z[,volayer | volume_id,layer_id])
    #[arg(long)]
    hits: PathBuf,
    /// Doublet table (CSV: start,end)
    #[arg(long)]
    doublets: PathBuf,
}

#[derive(Subcommand)]
enum Action {
    /// Build the model and write qubo.json, xplets.json and stats.json
    Build {
        #[command(flatten)]
        event: EventArgs,
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long)]
        out: PathBuf,
        /// Truth tracks (JSON); reports the energy of the ideal sample
        #[arg(long)]
        truth: Option<PathBuf>,
    },
    /// Turn a solver sample (JSON map: triplet → 0/1) into tracks
    Recreate {
        #[command(flatten)]
        event: EventArgs,
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long)]
        sample: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = DEFAULT_MIN_HITS_PER_TRACK)]
        min_hits: usize,
    },
    /// Write a synthetic event (hits.csv, doublets.csv, truth.json)
    Synth {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 20)]
        tracks: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 0)]
        index: u64,
        /// Fake doublets per true doublet
        #[arg(long, default_value_t = 0.5)]
        fake_ratio: f64,
    },
    /// Print a small provenance JSON block
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Build {
            event,
            model,
            out,
            truth,
        } => build(&event, &model, &out, truth.as_deref()),
        Action::Recreate {
            event,
            model,
            sample,
            out,
            min_hits,
        } => recreate(&event, &model, &sample, &out, min_hits),
        Action::Synth {
            out,
            tracks,
            seed,
            index,
            fake_ratio,
        } => synth(&out, tracks, EventToken { seed, index }, fake_ratio),
        Action::Report => report(),
    }
}

fn load_model(event: &EventArgs, args: &ModelArgs) -> Result<Model> {
    let cfg = args.resolve()?;
    let hits = io::read_hits(&event.hits)?;
    let doublets = io::read_doublets(&event.doublets)?;
    Model::build(cfg, &hits, &doublets).context("building model")
}

fn build(event: &EventArgs, args: &ModelArgs, out: &Path, truth: Option<&Path>) -> Result<()> {
    let model = load_model(event, args)?;
    let enc = model.to_qubo()?;
    tracing::info!(
        vars = enc.stats.n_vars,
        incl = enc.stats.n_incl_couplers,
        excl = enc.stats.n_excl_couplers,
        fallback_weights = enc.weights.n_fallback,
        "model built"
    );
    let outputs = dump::dump_model(out, &model, &enc)?;
    let mut params = serde_json::json!({ "config": model.cfg(), "qubo": enc.stats });
    if let Some(path) = truth {
        let tracks = io::read_tracks(path)?;
        let ideal = model.ideal_sample(&tracks);
        let energy = enc.qubo.energy(&ideal);
        tracing::info!(energy, "ideal sample energy");
        params["ideal_energy"] = serde_json::json!(energy);
    }
    let mut inputs = vec![event.hits.clone(), event.doublets.clone()];
    inputs.extend(truth.map(Path::to_path_buf));
    let payload = Payload::new(params).with_inputs(inputs);
    for artifact in &outputs {
        provenance::write_sidecar(artifact, &payload)?;
    }
    Ok(())
}

fn recreate(
    event: &EventArgs,
    args: &ModelArgs,
    sample_path: &Path,
    out: &Path,
    min_hits: usize,
) -> Result<()> {
    let model = load_model(event, args)?;
    let enc = model.to_qubo()?;
    let sample = io::read_sample(sample_path)?;
    let unknown = sample
        .keys()
        .filter(|k| model.graph().triplet_by_key(k).is_none())
        .count();
    if unknown > 0 {
        tracing::warn!(unknown, "sample names variables that are not in the model");
    }
    let mut report = model.report_sample(&enc.qubo, &sample);
    report.recreated.retain_min_hits(min_hits);
    tracing::info!(
        energy = report.energy,
        tracks = report.recreated.tracks.len(),
        conflicts = report.recreated.n_conflicts,
        "sample processed"
    );
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(out, serde_json::to_vec_pretty(&report)?)
        .with_context(|| format!("writing {}", out.display()))?;
    let payload = Payload::new(serde_json::json!({ "config": model.cfg(), "min_hits": min_hits }))
        .with_inputs([event.hits.clone(), event.doublets.clone(), sample_path.to_path_buf()]);
    provenance::write_sidecar(out, &payload)?;
    Ok(())
}

fn synth(out: &Path, tracks: usize, tok: EventToken, fake_ratio: f64) -> Result<()> {
    let cfg = SynthCfg {
        n_tracks: tracks,
        fake_ratio,
        ..SynthCfg::default()
    };
    let ev = draw_event(&cfg, tok);
    tracing::info!(
        hits = ev.hits.len(),
        doublets = ev.doublets.len(),
        fakes = ev.n_fake_doublets,
        "synthetic event"
    );
    let outputs = io::write_event(out, &ev)?;
    let payload = Payload::new(serde_json::json!({ "synth": cfg, "token": tok }));
    for artifact in &outputs {
        provenance::write_sidecar(artifact, &payload)?;
    }
    Ok(())
}

fn report() -> Result<()> {
    let payload = Payload::new(serde_json::json!({ "defaults": Config::default() }));
    let obj = provenance::block(&payload, &[]);
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
