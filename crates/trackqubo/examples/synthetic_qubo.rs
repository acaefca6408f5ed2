//! Build QUBOs for one synthetic event with every preset and report sizes and
//! the energy of the ideal (truth) sample.
//!
//! Run: `cargo run -p trackqubo --example synthetic_qubo --release -- [seed]`

use trackqubo::api::{draw_event, Config, EventToken, Model, SynthCfg, DEFAULT_MIN_HITS_PER_TRACK};

fn main() -> Result<(), trackqubo::Error> {
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2024u64);
    let ev = draw_event(&SynthCfg::default(), EventToken::new(seed));
    println!(
        "event seed={seed}: hits={} doublets={} (fake {}) tracks={}",
        ev.hits.len(),
        ev.doublets.len(),
        ev.n_fake_doublets,
        ev.truth.len()
    );
    println!("preset,vars,incl,excl,excl2,ideal_energy,tracks");
    for preset in ["base", "mp", "dj", "d0", "all"] {
        let model = Model::build(Config::preset(preset)?, &ev.hits, &ev.doublets)?;
        let enc = model.to_qubo()?;
        let ideal = model.ideal_sample(&ev.truth);
        let mut report = model.report_sample(&enc.qubo, &ideal);
        report.recreated.retain_min_hits(DEFAULT_MIN_HITS_PER_TRACK);
        println!(
            "{preset},{},{},{},{},{:.4},{}",
            enc.stats.n_vars,
            enc.stats.n_incl_couplers,
            enc.stats.n_excl_couplers,
            enc.stats.n_excl_type2,
            report.energy,
            report.recreated.tracks.len()
        );
    }
    Ok(())
}
