//! Remote-write body decoding: snappy block, then protobuf, then samples

use std::sync::Arc;

use prost::Message;
use tracing::debug;

use contracts::{Sample, Series};

use crate::error::Result;
use crate::proto::{TimeSeries, WriteRequest};

/// Decode a snappy-compressed `WriteRequest` body into samples.
///
/// Samples of one wire time series share a single `Arc<Series>`.
pub fn decode_write_request(body: &[u8]) -> Result<Vec<Sample>> {
    let raw = snap::raw::Decoder::new().decompress_vec(body)?;
    let request = WriteRequest::decode(raw.as_slice())?;

    let total: usize = request.timeseries.iter().map(|ts| ts.samples.len()).sum();
    debug!(
        series = request.timeseries.len(),
        samples = total,
        compressed = body.len(),
        decompressed = raw.len(),
        "Decoded write request"
    );

    let mut samples = Vec::with_capacity(total);
    for ts in request.timeseries {
        append_samples(ts, &mut samples);
    }
    Ok(samples)
}

fn append_samples(ts: TimeSeries, out: &mut Vec<Sample>) {
    // Later duplicates of a label name overwrite earlier ones.
    let series = Arc::new(Series::from_pairs(
        ts.labels.into_iter().map(|l| (l.name, l.value)),
    ));
    out.extend(
        ts.samples
            .into_iter()
            .map(|s| Sample::new(Arc::clone(&series), s.value, s.timestamp)),
    );
}

/// Encode samples grouped by series into a compressed `WriteRequest` body.
///
/// Inverse of [`decode_write_request`]; used by clients and tests.
pub fn encode_write_request(request: &WriteRequest) -> Result<Vec<u8>> {
    let raw = request.encode_to_vec();
    Ok(snap::raw::Encoder::new().compress_vec(&raw)?)
}
