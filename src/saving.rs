use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;

use crate::datagen::Observation;
use crate::loader;
use crate::model::EnergyModel;

/// Persist a trained model as a single compressed blob
pub fn save_model(model: &EnergyModel, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = std::io::BufWriter::new(encoder);

    serialize_into(&mut writer, model).map_err(std::io::Error::other)?;

    Ok(())
}

/// Load a previously persisted model blob
pub fn load_model(filename: &str) -> std::io::Result<EnergyModel> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let model: EnergyModel = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(model)
}

/// Write the historical series to a CSV file by full overwrite
///
/// The format round-trips through [`loader::parse_csv`]: a `date` column
/// (`YYYY-MM-DD HH:MM:SS`) and a `consumption_kwh` column.
pub fn write_observations(observations: &[Observation], filename: &str) -> std::io::Result<()> {
    let mut file = File::create(filename)?;

    writeln!(file, "date,consumption_kwh")?;
    for obs in observations {
        writeln!(
            file,
            "{},{}",
            obs.date.format("%Y-%m-%d %H:%M:%S"),
            obs.consumption_kwh
        )?;
    }

    Ok(())
}

/// Read the historical series back from its CSV file
///
/// # Errors
/// * Returns an error if the file cannot be read or fails the upload
///   contract (missing columns, unparseable rows)
pub fn read_observations(filename: &str) -> Result<Vec<Observation>, String> {
    let content = std::fs::read_to_string(filename)
        .map_err(|_| format!("Failed to read data file '{}'", filename))?;

    loader::parse_csv(&content)
}
