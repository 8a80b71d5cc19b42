use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{GatewayError, Result};
use crate::types::{BusId, Config, Frame, Signature, MAX_BUS, MAX_PAYLOAD, MAX_STANDARD_ID};

/// Witnessed bits are tracked in one `u64` per candidate
pub const MAX_CANDIDATE_ENTRIES: usize = u64::BITS as usize;

/// One source bus to target bus mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProfileRoute {
    pub from: BusId,
    pub to: BusId,
}

/// Forwarding table used once a candidate has matched
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ForwardingProfile {
    #[serde(default)]
    pub routes: Vec<ProfileRoute>,
}

impl ForwardingProfile {
    pub fn new(routes: &[(BusId, BusId)]) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|&(from, to)| ProfileRoute { from, to })
                .collect(),
        }
    }

    /// Target for `bus`; `None` (drop) for buses the profile does not name
    pub fn target(&self, bus: BusId) -> Option<BusId> {
        self.routes.iter().find(|r| r.from == bus).map(|r| r.to)
    }
}

/// A known vehicle wiring variant
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub entries: Vec<Signature>,
    #[serde(default)]
    pub profile: ForwardingProfile,
}

impl Candidate {
    pub fn new(name: &str, entries: &[Signature], profile: ForwardingProfile) -> Self {
        Self {
            name: name.to_string(),
            entries: entries.to_vec(),
            profile,
        }
    }

    fn full_mask(&self) -> u64 {
        match self.entries.len() {
            MAX_CANDIDATE_ENTRIES => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }
}

impl Config for Candidate {
    fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(GatewayError::EmptyCandidate(self.name.clone()));
        }
        if self.entries.len() > MAX_CANDIDATE_ENTRIES {
            return Err(GatewayError::CandidateTooLarge {
                name: self.name.clone(),
                count: self.entries.len(),
                limit: MAX_CANDIDATE_ENTRIES,
            });
        }
        if let Some(entry) = self.entries.iter().find(|e| e.id > MAX_STANDARD_ID) {
            return Err(GatewayError::CandidateIdOutOfRange {
                name: self.name.clone(),
                id: entry.id,
            });
        }
        if let Some(entry) = self.entries.iter().find(|e| usize::from(e.len) > MAX_PAYLOAD) {
            return Err(GatewayError::CandidateLengthOutOfRange {
                name: self.name.clone(),
                len: entry.len,
            });
        }
        if let Some(entry) = self.entries.iter().find(|e| e.bus > MAX_BUS) {
            return Err(GatewayError::CandidateBusOutOfRange {
                name: self.name.clone(),
                bus: entry.bus,
            });
        }
        Ok(())
    }
}

/// Identifies the attached vehicle from cumulative, order-independent evidence.
///
/// The candidate table is never mutated; progress lives in one witnessed
/// bitmask per candidate, so matching can be restarted with [`reset`].
///
/// [`reset`]: FingerprintMatcher::reset
#[derive(Debug, Clone)]
pub struct FingerprintMatcher {
    candidates: Vec<Candidate>,
    witnessed: Vec<u64>,
    identified: Option<usize>,
    frames_scanned: u64,
}

impl FingerprintMatcher {
    pub fn new(candidates: Vec<Candidate>) -> Result<Self> {
        for candidate in &candidates {
            candidate.validate()?;
        }
        let witnessed = vec![0; candidates.len()];
        Ok(Self {
            candidates,
            witnessed,
            identified: None,
            frames_scanned: 0,
        })
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Index of the matched candidate, once set never changes until reset
    pub fn identified(&self) -> Option<usize> {
        self.identified
    }

    pub fn identified_candidate(&self) -> Option<&Candidate> {
        self.identified.and_then(|i| self.candidates.get(i))
    }

    /// Number of frames that caused a table scan
    pub fn frames_scanned(&self) -> u64 {
        self.frames_scanned
    }

    /// Number of witnessed entries for the candidate at `index`
    pub fn progress(&self, index: usize) -> Option<u32> {
        self.witnessed.get(index).map(|mask| mask.count_ones())
    }

    /// Feeds one inbound frame; returns the candidate index on the frame that
    /// completes a match, `None` otherwise.
    pub fn observe(&mut self, frame: &Frame) -> Option<usize> {
        if self.identified.is_some() {
            return None;
        }
        let signature = frame.signature()?;
        self.frames_scanned += 1;

        for (candidate, mask) in self.candidates.iter().zip(self.witnessed.iter_mut()) {
            for (bit, entry) in candidate.entries.iter().enumerate() {
                if *entry == signature && *mask & (1 << bit) == 0 {
                    *mask |= 1 << bit;
                    debug!(
                        candidate = %candidate.name,
                        bus = entry.bus,
                        id = entry.id,
                        len = entry.len,
                        "fingerprint entry witnessed"
                    );
                }
            }
        }

        let matched = self
            .candidates
            .iter()
            .zip(&self.witnessed)
            .position(|(candidate, mask)| *mask == candidate.full_mask())?;
        info!(
            index = matched,
            candidate = %self.candidates[matched].name,
            "vehicle fingerprint matched"
        );
        self.identified = Some(matched);
        Some(matched)
    }

    pub fn reset(&mut self) {
        self.witnessed.iter_mut().for_each(|mask| *mask = 0);
        self.identified = None;
        self.frames_scanned = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bus: BusId, id: u32, len: usize) -> Frame {
        Frame::standard(bus, id, &vec![0; len]).unwrap()
    }

    fn matcher() -> FingerprintMatcher {
        FingerprintMatcher::new(vec![
            Candidate::new(
                "camera_on_bus2",
                &[Signature::new(2, 832, 8), Signature::new(0, 339, 8)],
                ForwardingProfile::new(&[(0, 2), (2, 0)]),
            ),
            Candidate::new(
                "camera_on_bus1",
                &[Signature::new(1, 832, 8), Signature::new(0, 339, 8)],
                ForwardingProfile::new(&[(0, 1), (1, 0)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_match_needs_every_entry() {
        let mut matcher = matcher();
        assert_eq!(matcher.observe(&frame(0, 339, 8)), None);
        assert_eq!(matcher.identified(), None);
        assert_eq!(matcher.observe(&frame(2, 832, 8)), Some(0));
        assert_eq!(matcher.identified(), Some(0));
    }

    #[test]
    fn test_progress_is_per_candidate() {
        let mut matcher = matcher();
        matcher.observe(&frame(0, 339, 8));
        assert_eq!(matcher.progress(0), Some(1));
        assert_eq!(matcher.progress(1), Some(1));
        matcher.observe(&frame(1, 832, 8));
        assert_eq!(matcher.progress(0), Some(1));
        assert_eq!(matcher.identified(), Some(1));
    }

    #[test]
    fn test_length_is_part_of_the_signature() {
        let mut matcher = matcher();
        matcher.observe(&frame(0, 339, 8));
        assert_eq!(matcher.observe(&frame(2, 832, 7)), None);
        assert_eq!(matcher.progress(0), Some(1));
    }

    #[test]
    fn test_first_declared_candidate_wins_ties() {
        let shared = [Signature::new(0, 339, 8)];
        let mut matcher = FingerprintMatcher::new(vec![
            Candidate::new("first", &shared, ForwardingProfile::default()),
            Candidate::new("second", &shared, ForwardingProfile::default()),
        ])
        .unwrap();
        assert_eq!(matcher.observe(&frame(0, 339, 8)), Some(0));
    }

    #[test]
    fn test_no_scans_after_match() {
        let mut matcher = matcher();
        matcher.observe(&frame(0, 339, 8));
        matcher.observe(&frame(2, 832, 8));
        let scanned = matcher.frames_scanned();
        assert_eq!(matcher.observe(&frame(1, 832, 8)), None);
        assert_eq!(matcher.frames_scanned(), scanned);
        assert_eq!(matcher.identified(), Some(0));
    }

    #[test]
    fn test_reset_restarts_matching() {
        let mut matcher = matcher();
        matcher.observe(&frame(0, 339, 8));
        matcher.observe(&frame(2, 832, 8));
        matcher.reset();
        assert_eq!(matcher.identified(), None);
        assert_eq!(matcher.progress(0), Some(0));
        matcher.observe(&frame(1, 832, 8));
        assert_eq!(matcher.observe(&frame(0, 339, 8)), Some(1));
    }

    #[test]
    fn test_extended_frames_never_match() {
        let mut matcher = matcher();
        matcher.observe(&Frame::extended(0, 339, &[0; 8]).unwrap());
        assert_eq!(matcher.progress(0), Some(0));
        assert_eq!(matcher.frames_scanned(), 0);
    }

    #[test]
    fn test_rejects_invalid_candidates() {
        assert!(matches!(
            FingerprintMatcher::new(vec![Candidate::new(
                "empty",
                &[],
                ForwardingProfile::default()
            )]),
            Err(GatewayError::EmptyCandidate(_))
        ));
        assert!(matches!(
            FingerprintMatcher::new(vec![Candidate::new(
                "extended",
                &[Signature::new(0, 0x800, 8)],
                ForwardingProfile::default()
            )]),
            Err(GatewayError::CandidateIdOutOfRange { id: 0x800, .. })
        ));
        let entries: Vec<Signature> = (0..65).map(|id| Signature::new(0, id, 8)).collect();
        assert!(matches!(
            FingerprintMatcher::new(vec![Candidate::new(
                "huge",
                &entries,
                ForwardingProfile::default()
            )]),
            Err(GatewayError::CandidateTooLarge { count: 65, .. })
        ));
    }

    #[test]
    fn test_rejects_unmatchable_entries() {
        let candidate = |entry: Signature| {
            Candidate::new("unmatchable", &[entry], ForwardingProfile::default())
        };
        assert!(matches!(
            candidate(Signature::new(0, 339, 9)).validate(),
            Err(GatewayError::CandidateLengthOutOfRange { len: 9, .. })
        ));
        assert!(matches!(
            candidate(Signature::new(16, 339, 8)).validate(),
            Err(GatewayError::CandidateBusOutOfRange { bus: 16, .. })
        ));
        assert!(candidate(Signature::new(15, 339, 8)).validate().is_ok());
        assert!(candidate(Signature::new(0, 339, 0)).validate().is_ok());
    }

    #[test]
    fn test_profile_lookup() {
        let profile = ForwardingProfile::new(&[(0, 2), (2, 0)]);
        assert_eq!(profile.target(0), Some(2));
        assert_eq!(profile.target(2), Some(0));
        assert_eq!(profile.target(1), None);
        assert_eq!(profile.target(15), None);
    }
}
