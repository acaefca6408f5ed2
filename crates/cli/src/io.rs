//! CSV/JSON boundary: hit and doublet tables in, synthetic events out.
//!
//! Hit tables need `hit_id, x, y, z`. The layer index is read from a
//! `volayer` column, or derived from TrackML `volume_id, layer_id` for the
//! barrel layers; hits outside those layers get no layer. Doublet tables need
//! `start, end` hit-id columns.

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use trackqubo::api::{Hit, HitId, Sample, SynthEvent};

/// TrackML `(volume_id, layer_id)` pairs, inner to outer; the position is the volayer.
const BARREL_LAYERS: [(i64, i64); 10] = [
    (8, 2),
    (8, 4),
    (8, 6),
    (8, 8),
    (13, 2),
    (13, 4),
    (13, 6),
    (13, 8),
    (17, 2),
    (17, 4),
];

fn read_csv(path: &Path) -> Result<DataFrame> {
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .finish()
        .and_then(|lf| lf.collect())
        .with_context(|| format!("reading {}", path.display()))
}

fn f64_col(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let s = df
        .column(name)
        .with_context(|| format!("missing column `{name}`"))?
        .cast(&DataType::Float64)?;
    s.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.with_context(|| format!("null `{name}` at row {row}")))
        .collect()
}

fn opt_i64_col(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let s = df
        .column(name)
        .with_context(|| format!("missing column `{name}`"))?
        .cast(&DataType::Int64)?;
    Ok(s.i64()?.into_iter().collect())
}

fn i64_col(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    opt_i64_col(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.with_context(|| format!("null `{name}` at row {row}")))
        .collect()
}

fn id_col(df: &DataFrame, name: &str) -> Result<Vec<HitId>> {
    i64_col(df, name)?
        .into_iter()
        .map(|v| HitId::try_from(v).with_context(|| format!("negative hit id {v} in `{name}`")))
        .collect()
}

fn has_col(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

pub fn read_hits(path: &Path) -> Result<Vec<Hit>> {
    let df = read_csv(path)?;
    let ids = id_col(&df, "hit_id")?;
    let (xs, ys, zs) = (f64_col(&df, "x")?, f64_col(&df, "y")?, f64_col(&df, "z")?);
    let volayers: Vec<Option<u32>> = if has_col(&df, "volayer") {
        opt_i64_col(&df, "volayer")?
            .into_iter()
            .map(|v| v.and_then(|v| u32::try_from(v).ok()))
            .collect()
    } else if has_col(&df, "volume_id") && has_col(&df, "layer_id") {
        let vols = i64_col(&df, "volume_id")?;
        let lays = i64_col(&df, "layer_id")?;
        vols.into_iter()
            .zip(lays)
            .map(|(v, l)| {
                BARREL_LAYERS
                    .iter()
                    .position(|&p| p == (v, l))
                    .map(|k| k as u32)
            })
            .collect()
    } else {
        vec![None; ids.len()]
    };
    let hits: Vec<Hit> = ids
        .into_iter()
        .zip(xs)
        .zip(ys)
        .zip(zs)
        .zip(volayers)
        .map(|((((id, x), y), z), volayer)| Hit {
            id,
            x,
            y,
            z,
            volayer,
        })
        .collect();
    tracing::debug!(n = hits.len(), path = %path.display(), "hits loaded");
    Ok(hits)
}

pub fn read_doublets(path: &Path) -> Result<Vec<(HitId, HitId)>> {
    let df = read_csv(path)?;
    let starts = id_col(&df, "start")?;
    let ends = id_col(&df, "end")?;
    if starts.len() != ends.len() {
        bail!("ragged doublet table {}", path.display());
    }
    Ok(starts.into_iter().zip(ends).collect())
}

pub fn read_sample(path: &Path) -> Result<Sample> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing sample {}", path.display()))
}

pub fn read_tracks(path: &Path) -> Result<Vec<Vec<HitId>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing tracks {}", path.display()))
}

fn write_df(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))
}

/// Write `hits.csv`, `doublets.csv` and `truth.json` under `dir`.
pub fn write_event(dir: &Path, ev: &SynthEvent) -> Result<Vec<std::path::PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut hits = df!(
        "hit_id" => ev.hits.iter().map(|h| h.id).collect::<Vec<u64>>(),
        "x" => ev.hits.iter().map(|h| h.x).collect::<Vec<f64>>(),
        "y" => ev.hits.iter().map(|h| h.y).collect::<Vec<f64>>(),
        "z" => ev.hits.iter().map(|h| h.z).collect::<Vec<f64>>(),
        "volayer" => ev.hits.iter().map(|h| h.volayer).collect::<Vec<Option<u32>>>(),
    )?;
    let mut doublets = df!(
        "start" => ev.doublets.iter().map(|d| d.0).collect::<Vec<u64>>(),
        "end" => ev.doublets.iter().map(|d| d.1).collect::<Vec<u64>>(),
    )?;
    let hits_path = dir.join("hits.csv");
    let doublets_path = dir.join("doublets.csv");
    let truth_path = dir.join("truth.json");
    write_df(&hits_path, &mut hits)?;
    write_df(&doublets_path, &mut doublets)?;
    std::fs::write(&truth_path, serde_json::to_vec(&ev.truth)?)
        .with_context(|| format!("writing {}", truth_path.display()))?;
    Ok(vec![hits_path, doublets_path, truth_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trackqubo::api::{draw_event, EventToken, SynthCfg};

    #[test]
    fn synthetic_event_survives_csv_round_trip() {
        let dir = tempdir().unwrap();
        let ev = draw_event(&SynthCfg::default(), EventToken::new(9));
        write_event(dir.path(), &ev).unwrap();
        let hits = read_hits(&dir.path().join("hits.csv")).unwrap();
        let doublets = read_doublets(&dir.path().join("doublets.csv")).unwrap();
        let truth = read_tracks(&dir.path().join("truth.json")).unwrap();
        assert_eq!(hits.len(), ev.hits.len());
        assert_eq!(doublets, ev.doublets);
        assert_eq!(truth, ev.truth);
        for (a, b) in hits.iter().zip(&ev.hits) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.volayer, b.volayer);
            assert!((a.x - b.x).abs() < 1e-9 && (a.z - b.z).abs() < 1e-9);
        }
    }

    #[test]
    fn trackml_layers_map_to_volayers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hits.csv");
        std::fs::write(
            &path,
            "hit_id,x,y,z,volume_id,layer_id\n1,32.0,0.0,1.0,8,2\n2,72.0,0.0,2.0,13,4\n3,1.0,1.0,3.0,9,2\n",
        )
        .unwrap();
        let hits = read_hits(&path).unwrap();
        let layers: Vec<Option<u32>> = hits.iter().map(|h| h.volayer).collect();
        assert_eq!(layers, vec![Some(0), Some(5), None]);

        std::fs::write(&path, "hit_id,x,y,z,volayer\n1,32.0,0.0,1.0,0\n2,72.0,0.0,2.0,\n").unwrap();
        let hits = read_hits(&path).unwrap();
        assert_eq!(hits[0].volayer, Some(0));
        assert_eq!(hits[1].volayer, None);
    }

    #[test]
    fn missing_columns_are_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doublets.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let err = read_doublets(&path).unwrap_err();
        assert!(format!("{err:#}").contains("start"));
    }
}
