//! Write an example payload description and target catalog.
//!
//! `generate_sample [DIR]` creates `DIR/payload_example.xml` and
//! `DIR/target_list.csv` (DIR defaults to the current directory).

use std::path::PathBuf;

use anyhow::{Context, Result};

const PAYLOAD: &str = r#"<root>
    <common>
        <wl_min unit="micron">0.5</wl_min>
        <wl_max unit="micron">7.8</wl_max>
    </common>
    <channel name="Phot">
        <channelClass>Photometer</channelClass>
        <wl_min unit="micron">0.5</wl_min>
        <wl_max unit="micron">0.8</wl_max>
    </channel>
    <channel name="SWIR">
        <channelClass>Spectrometer</channelClass>
        <targetR>20</targetR>
        <wl_min unit="micron">1.1</wl_min>
        <wl_max unit="micron">1.95</wl_max>
    </channel>
    <channel name="MWIR">
        <channelClass>Spectrometer</channelClass>
        <targetR>50</targetR>
        <wl_min unit="micron">1.95</wl_min>
        <wl_max unit="micron">7.8</wl_max>
    </channel>
</root>
"#;

/// (star name, Teff [K], R [Rsun], M [Msun], D [pc], planet suffix, Rp [Rjup], Mp [Mjup], P [d])
const SYSTEMS: &[(&str, f64, f64, f64, f64, &str, f64, f64, f64)] = &[
    ("HD 209458", 6065.0, 1.20, 1.12, 48.3, "b", 1.38, 0.69, 3.52),
    ("HD 189733", 5050.0, 0.81, 0.85, 19.8, "b", 1.14, 1.16, 2.22),
    ("WASP-12", 6300.0, 1.60, 1.43, 432.0, "b", 1.90, 1.47, 1.09),
    ("GJ 1214", 3026.0, 0.22, 0.18, 14.6, "b", 0.24, 0.02, 1.58),
    ("55 Cnc", 5196.0, 0.94, 0.91, 12.6, "e", 0.17, 0.03, 0.74),
];

fn main() -> Result<()> {
    env_logger::init();
    let dir = std::env::args().nth(1).map_or_else(|| PathBuf::from("."), PathBuf::from);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let payload_path = dir.join("payload_example.xml");
    std::fs::write(&payload_path, PAYLOAD).context("writing payload")?;

    let catalog_path = dir.join("target_list.csv");
    let mut writer = csv::Writer::from_path(&catalog_path).context("opening catalog")?;
    writer.write_record([
        "star name",
        "star Teff [K]",
        "star R [Rsun]",
        "star M [Msun]",
        "star D [pc]",
        "planet name",
        "planet R [Rjup]",
        "planet M [Mjup]",
        "planet P [d]",
    ])?;
    for &(star, teff, r, m, d, suffix, rp, mp, period) in SYSTEMS {
        writer.write_record([
            star.to_string(),
            teff.to_string(),
            r.to_string(),
            m.to_string(),
            d.to_string(),
            format!("{star} {suffix}"),
            rp.to_string(),
            mp.to_string(),
            period.to_string(),
        ])?;
    }
    writer.flush()?;

    println!("Wrote {}", payload_path.display());
    println!("Wrote {} ({} targets)", catalog_path.display(), SYSTEMS.len());
    Ok(())
}
