//! HID++ protocol engine
//!
//! [`Hidpp`] turns typed calls into request/response exchanges over a
//! [`Transport`]. It is not pipelined: every call writes one report, then reads
//! until the correlated reply arrives or the call deadline passes. Replies are
//! correlated on `(target, feature index, function, sequence)`; anything else
//! read in the meantime is dropped.
//!
//! The engine never retries. Recovery is the caller's decision, built from
//! [`Hidpp::flush`], [`Hidpp::ping`] and [`Hidpp::resync`].

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::command::{
    ByteResponse, FeatureIdResponse, FeatureIndexResponse, GetFeatureCount, GetFeatureId,
    GetFeatureIndex, HidppCommand, HidppResponse, Ping, PingResponse,
};
use crate::descriptor::parse_hidpp_reports;
use crate::error::TransportError;
use crate::protocol::{feature, func, index, TARGET_DEFAULT};
use crate::report::{self, Reply};
use crate::types::{FeatureEntry, FeatureFlags, ReportType};
use crate::Transport;

/// Default overall deadline of one call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Inbound frame correlated with the outstanding request
enum Outcome {
    Payload(Vec<u8>),
    /// HID++ 1.0 error, only meaningful to the protocol probe
    Legacy(u8),
}

/// HID++ connection to one device node
pub struct Hidpp<T: Transport> {
    transport: T,
    reports: Vec<ReportType>,
    /// Feature id to table entry, per target. `None` caches a miss.
    features: HashMap<(u8, u16), Option<FeatureEntry>>,
    /// Feature table slot to entry, per target
    feature_slots: HashMap<(u8, u8), FeatureEntry>,
    feature_counts: HashMap<u8, u8>,
    sequences: HashMap<u8, u8>,
    ping_seq: u8,
    protocol_version: u8,
    timeout: Duration,
}

impl<T: Transport> Hidpp<T> {
    /// Read the report descriptor, check the protocol version and ping.
    pub fn open(transport: T) -> Result<Self, TransportError> {
        let descriptor = transport.report_descriptor()?;
        let reports = parse_hidpp_reports(&descriptor)?;

        // Start pings somewhere unpredictable so replies meant for a previous
        // process do not match ours
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);

        let mut hidpp = Self {
            transport,
            reports,
            features: HashMap::new(),
            feature_slots: HashMap::new(),
            feature_counts: HashMap::new(),
            sequences: HashMap::new(),
            ping_seq: (seed % 255) as u8 + 1,
            protocol_version: 0,
            timeout: DEFAULT_TIMEOUT,
        };

        let (version, _) = hidpp.get_protocol(TARGET_DEFAULT)?;
        if version < 2 {
            return Err(TransportError::UnsupportedProtocolVersion(version));
        }
        hidpp.protocol_version = version;
        hidpp.ping(TARGET_DEFAULT)?;

        info!(
            "opened {} protocol version {}",
            hidpp.transport.path(),
            version
        );
        Ok(hidpp)
    }

    pub fn path(&self) -> &str {
        self.transport.path()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// HID++ version detected at open
    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// Report types the device accepts, smallest first
    pub fn reports(&self) -> &[ReportType] {
        &self.reports
    }

    /// Size of the largest report, excluding the report id
    pub fn max_report_size(&self) -> usize {
        self.reports.last().map(|r| r.size).unwrap_or(0)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    // =========================================================================
    // Exchange
    // =========================================================================

    fn next_sequence(&mut self, target: u8) -> u8 {
        let seq = self.sequences.entry(target).or_insert(0);
        *seq = if *seq >= 0x0f { 1 } else { *seq + 1 };
        *seq
    }

    /// Write one request; returns its function byte for correlation.
    fn send(
        &mut self,
        target: u8,
        feature_index: u8,
        function: u8,
        payload: &[u8],
    ) -> Result<u8, TransportError> {
        let report = report::select_report(&self.reports, payload.len())?;
        let function_byte = report::function_byte(function, self.next_sequence(target));
        let frame = report::encode(report, target, feature_index, function_byte, payload);

        debug!("send [{}]", report::hex(&frame));
        let written = self.transport.write_report(&frame)?;
        if written != frame.len() {
            debug!("unexpected write size {written} on {}", self.path());
            return Err(TransportError::IoLength);
        }
        Ok(function_byte)
    }

    /// Read until the reply correlated with the request arrives.
    fn receive(
        &mut self,
        target: u8,
        feature_index: u8,
        function_byte: u8,
        deadline: Instant,
    ) -> Result<Outcome, TransportError> {
        let mut buf = vec![0u8; self.max_report_size() + 1];
        loop {
            let n = self.transport.read_report(&mut buf, deadline)?;
            let frame = &buf[..n];
            debug!("recv [{}]", report::hex(frame));

            if report::check_frame(&self.reports, frame)?.is_some() {
                match report::classify(frame, target, feature_index, function_byte) {
                    Reply::Response(payload) => return Ok(Outcome::Payload(payload.to_vec())),
                    Reply::DeviceError(code) => return Err(TransportError::Device(code)),
                    Reply::LegacyError(code) => return Ok(Outcome::Legacy(code)),
                    Reply::Unrelated => {}
                }
            }

            if Instant::now() >= deadline {
                return Err(TransportError::Timedout);
            }
        }
    }

    fn exchange(
        &mut self,
        target: u8,
        feature_index: u8,
        function: u8,
        payload: &[u8],
    ) -> Result<Outcome, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let function_byte = self.send(target, feature_index, function, payload)?;
        self.receive(target, feature_index, function_byte, deadline)
    }

    /// Call a function by feature index, bypassing feature resolution.
    pub fn call_index(
        &mut self,
        target: u8,
        feature_index: u8,
        function: u8,
        payload: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        match self.exchange(target, feature_index, function, payload)? {
            Outcome::Payload(data) => Ok(data),
            Outcome::Legacy(code) => Err(TransportError::Device(code)),
        }
    }

    /// Call a device function and return the reply payload.
    ///
    /// The payload is everything after the header, padding included.
    ///
    /// # Arguments
    /// * `target` - Sub-device, usually [`TARGET_DEFAULT`]
    /// * `feature_id` - Stable feature id (e.g. `protocol::feature::LEDS`)
    /// * `function` - Function number within the feature
    /// * `payload` - Request parameters
    pub fn call(
        &mut self,
        target: u8,
        feature_id: u16,
        function: u8,
        payload: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        let feature_index = self.resolve_feature(target, feature_id)?;
        self.call_index(target, feature_index, function, payload)
    }

    /// Send a typed command, returning the raw reply payload.
    pub fn execute<C: HidppCommand>(
        &mut self,
        target: u8,
        cmd: &C,
    ) -> Result<Vec<u8>, TransportError> {
        self.call(target, C::FEATURE, C::FUNCTION, &cmd.to_payload())
    }

    /// Send a typed command and decode its reply.
    pub fn query<C: HidppCommand, R: HidppResponse>(
        &mut self,
        target: u8,
        cmd: &C,
    ) -> Result<R, TransportError> {
        let payload = self.execute(target, cmd)?;
        Ok(R::parse(&payload)?)
    }

    // =========================================================================
    // Root feature
    // =========================================================================

    /// Probe the protocol version: `(version, handler)`.
    ///
    /// HID++ 1.0 devices answer the probe with an error report.
    pub fn get_protocol(&mut self, target: u8) -> Result<(u8, u8), TransportError> {
        match self.exchange(target, index::ROOT, func::ROOT_PING, &[])? {
            Outcome::Legacy(_) => Ok((1, 0)),
            Outcome::Payload(data) => {
                let reply = PingResponse::parse(&data)?;
                Ok((reply.protocol, reply.handler))
            }
        }
    }

    /// Round trip with a fresh echo byte.
    ///
    /// Replies echoing a different byte are from earlier pings and are skipped.
    pub fn ping(&mut self, target: u8) -> Result<(), TransportError> {
        let echo = self.ping_seq;
        self.ping_seq = if echo == u8::MAX { 1 } else { echo + 1 };

        let deadline = Instant::now() + self.timeout;
        let payload = Ping { echo }.to_payload();
        let function_byte = self.send(target, index::ROOT, Ping::FUNCTION, &payload)?;
        loop {
            match self.receive(target, index::ROOT, function_byte, deadline)? {
                Outcome::Legacy(code) => return Err(TransportError::Device(code)),
                Outcome::Payload(data) => {
                    if PingResponse::parse(&data)?.echo == echo {
                        return Ok(());
                    }
                    debug!("skipping stale ping reply");
                }
            }
        }
    }

    /// Discard unread inbound reports.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.transport.drain()
    }

    /// Flush then ping. Never fails, only reports whether the device answered.
    pub fn resync(&mut self, target: u8) -> bool {
        if let Err(e) = self.flush() {
            debug!("resync flush failed: {e}");
            return false;
        }
        match self.ping(target) {
            Ok(()) => true,
            Err(e) => {
                debug!("resync ping failed: {e}");
                false
            }
        }
    }

    // =========================================================================
    // Feature table
    // =========================================================================

    /// Table entry for a feature id, `None` if the device lacks it.
    pub fn feature_entry(
        &mut self,
        target: u8,
        feature_id: u16,
    ) -> Result<Option<FeatureEntry>, TransportError> {
        match feature_id {
            feature::ROOT => {
                return Ok(Some(FeatureEntry {
                    index: index::ROOT,
                    id: feature::ROOT,
                    flags: FeatureFlags::default(),
                }))
            }
            feature::FEATURE => {
                return Ok(Some(FeatureEntry {
                    index: index::FEATURE,
                    id: feature::FEATURE,
                    flags: FeatureFlags::default(),
                }))
            }
            _ => {}
        }

        if let Some(entry) = self.features.get(&(target, feature_id)) {
            return Ok(*entry);
        }

        let payload = GetFeatureIndex { id: feature_id }.to_payload();
        let data = self.call_index(target, index::ROOT, func::ROOT_GET_FEATURE, &payload)?;
        let reply = FeatureIndexResponse::parse(&data)?;

        let entry = (reply.index != 0).then_some(FeatureEntry {
            index: reply.index,
            id: feature_id,
            flags: reply.flags,
        });
        match entry {
            Some(e) => debug!("feature {feature_id:04x} is at {}", e.index),
            None => debug!("feature {feature_id:04x} not present"),
        }
        self.features.insert((target, feature_id), entry);
        Ok(entry)
    }

    /// Feature index for a feature id.
    ///
    /// Both hits and misses are cached for the life of the connection.
    pub fn resolve_feature(&mut self, target: u8, feature_id: u16) -> Result<u8, TransportError> {
        self.feature_entry(target, feature_id)?
            .map(|e| e.index)
            .ok_or(TransportError::FeatureNotFound(feature_id))
    }

    /// Whether the device implements a feature
    pub fn has_feature(&mut self, target: u8, feature_id: u16) -> Result<bool, TransportError> {
        Ok(self.feature_entry(target, feature_id)?.is_some())
    }

    /// Number of entries in the feature table, root excluded
    pub fn feature_count(&mut self, target: u8) -> Result<u8, TransportError> {
        if let Some(&count) = self.feature_counts.get(&target) {
            return Ok(count);
        }
        let count: ByteResponse = self.query(target, &GetFeatureCount)?;
        self.feature_counts.insert(target, count.0);
        Ok(count.0)
    }

    /// Feature stored at a table slot
    pub fn feature_id(&mut self, target: u8, slot: u8) -> Result<FeatureEntry, TransportError> {
        if slot == index::ROOT || slot == index::FEATURE {
            let id = if slot == index::ROOT {
                feature::ROOT
            } else {
                feature::FEATURE
            };
            return Ok(FeatureEntry {
                index: slot,
                id,
                flags: FeatureFlags::default(),
            });
        }
        if let Some(entry) = self.feature_slots.get(&(target, slot)) {
            return Ok(*entry);
        }

        let reply: FeatureIdResponse = self.query(target, &GetFeatureId { index: slot })?;
        let entry = FeatureEntry {
            index: slot,
            id: reply.id,
            flags: reply.flags,
        };
        debug!("feature {:04x} is at {slot}", reply.id);
        self.feature_slots.insert((target, slot), entry);
        self.features.entry((target, reply.id)).or_insert(Some(entry));
        Ok(entry)
    }

    /// Whole feature table, root included
    pub fn features(&mut self, target: u8) -> Result<Vec<FeatureEntry>, TransportError> {
        let count = self.feature_count(target)?;
        (0..=count).map(|slot| self.feature_id(target, slot)).collect()
    }
}
