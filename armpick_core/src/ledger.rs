//! Placement modes and the session ledger.
//!
//! The original project carried one near-identical script per stacking
//! variant (tower, sorting zones, pyramid slots); here they collapse into a
//! single `PlacementMode` value interpreted by the sequencer. The ledger is
//! the only cross-cycle state: mutated exactly once per successful
//! placement, never rolled back (a failed cycle leaves it untouched).

use std::collections::BTreeMap;

use armpick_traits::Detection;

use crate::error::PickError;
use crate::workspace::WorkspacePoint;

/// Cumulative placement state for one session.
#[derive(Debug, Clone, Default)]
pub struct PlacementLedger {
    /// Total stacked height in mm (tower mode).
    pub stack_height: f32,
    /// Successful placements this session, any mode.
    pub placed_count: u32,
    /// Per-zone occupancy (zone mode).
    pub zone_counts: BTreeMap<String, u32>,
    /// Cursor into the slot table (slot mode).
    pub next_slot_index: usize,
}

/// One named drop zone.
#[derive(Debug, Clone)]
pub struct ZoneCfg {
    pub id: String,
    pub position: WorkspacePoint,
    pub capacity: u32,
}

/// How zone mode picks a destination zone for a given cup.
///
/// `Custom` receives the triggering detection and a ledger snapshot, and
/// returns a zone id; this is how callers express the original's
/// position/size/pattern sorting criteria without this crate knowing them.
pub enum ZonePolicy {
    RoundRobin,
    LeastOccupied,
    Custom(Box<dyn Fn(&Detection, &PlacementLedger) -> String + Send>),
}

impl std::fmt::Debug for ZonePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZonePolicy::RoundRobin => f.write_str("RoundRobin"),
            ZonePolicy::LeastOccupied => f.write_str("LeastOccupied"),
            ZonePolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The three mutually exclusive placement variants.
#[derive(Debug)]
pub enum PlacementMode {
    /// Stack straight up at a fixed (x, y).
    Tower { base: WorkspacePoint, cup_height: f32 },
    /// Sort into named zones with per-zone capacities.
    Zone {
        zones: Vec<ZoneCfg>,
        policy: ZonePolicy,
    },
    /// Place into an ordered slot table (pyramid or named positions).
    Slot { slots: Vec<WorkspacePoint> },
}

/// What to advance in the ledger once the cycle that reserved this
/// destination completes. Holding the ticket instead of mutating up front
/// is what keeps failed cycles from touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlacementTicket {
    Tower,
    Zone(String),
    Slot,
}

impl PlacementMode {
    /// Compute the next destination point for `detection` without mutating
    /// anything. Exhaustion (`ZoneFull`, `NoSlotsRemaining`) is detected
    /// here, before any motion is commanded.
    pub(crate) fn next_destination(
        &self,
        detection: &Detection,
        ledger: &PlacementLedger,
    ) -> Result<(WorkspacePoint, PlacementTicket), PickError> {
        match self {
            PlacementMode::Tower { base, cup_height } => {
                let dest = WorkspacePoint {
                    x: base.x,
                    y: base.y,
                    z: base.z + ledger.placed_count as f32 * cup_height,
                };
                Ok((dest, PlacementTicket::Tower))
            }
            PlacementMode::Zone { zones, policy } => {
                let zone = select_zone(zones, policy, detection, ledger)?;
                let count = ledger.zone_counts.get(&zone.id).copied().unwrap_or(0);
                if count >= zone.capacity {
                    return Err(PickError::ZoneFull(zone.id.clone()));
                }
                Ok((zone.position, PlacementTicket::Zone(zone.id.clone())))
            }
            PlacementMode::Slot { slots } => match slots.get(ledger.next_slot_index) {
                Some(p) => Ok((*p, PlacementTicket::Slot)),
                None => Err(PickError::NoSlotsRemaining),
            },
        }
    }

    /// Apply a ticket after the RETREAT->HOME path completed. The single
    /// mutation point for the ledger. Kept crate-internal so a ticket can
    /// only ever meet the mode that issued it.
    pub(crate) fn apply(&self, ticket: PlacementTicket, ledger: &mut PlacementLedger) {
        match (self, ticket) {
            (PlacementMode::Tower { cup_height, .. }, PlacementTicket::Tower) => {
                ledger.stack_height += cup_height;
            }
            (PlacementMode::Zone { .. }, PlacementTicket::Zone(id)) => {
                *ledger.zone_counts.entry(id).or_insert(0) += 1;
            }
            (PlacementMode::Slot { .. }, PlacementTicket::Slot) => {
                ledger.next_slot_index += 1;
            }
            (mode, ticket) => {
                // A ticket can only come from this mode's own reservation.
                unreachable!("ticket {ticket:?} does not match mode {mode:?}");
            }
        }
        ledger.placed_count += 1;
    }
}

fn select_zone<'z>(
    zones: &'z [ZoneCfg],
    policy: &ZonePolicy,
    detection: &Detection,
    ledger: &PlacementLedger,
) -> Result<&'z ZoneCfg, PickError> {
    match policy {
        ZonePolicy::RoundRobin => {
            let idx = ledger.placed_count as usize % zones.len();
            Ok(&zones[idx])
        }
        ZonePolicy::LeastOccupied => zones
            .iter()
            .min_by_key(|z| ledger.zone_counts.get(&z.id).copied().unwrap_or(0))
            .ok_or_else(|| PickError::State("zone table is empty".into())),
        ZonePolicy::Custom(f) => {
            let id = f(detection, ledger);
            zones
                .iter()
                .find(|z| z.id == id)
                .ok_or_else(|| PickError::State(format!("classifier chose unknown zone '{id}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det() -> Detection {
        Detection {
            x: 100.0,
            y: 100.0,
            w: 40.0,
            h: 40.0,
            confidence: 0.9,
        }
    }

    fn zones() -> Vec<ZoneCfg> {
        vec![
            ZoneCfg {
                id: "left".into(),
                position: WorkspacePoint::new(-100.0, 250.0, 50.0),
                capacity: 2,
            },
            ZoneCfg {
                id: "right".into(),
                position: WorkspacePoint::new(100.0, 250.0, 50.0),
                capacity: 2,
            },
        ]
    }

    #[test]
    fn tower_destination_climbs_by_cup_height() {
        let mode = PlacementMode::Tower {
            base: WorkspacePoint::new(0.0, 250.0, 50.0),
            cup_height: 12.0,
        };
        let mut ledger = PlacementLedger::default();
        for expected_z in [50.0, 62.0, 74.0] {
            let (dest, ticket) = mode.next_destination(&det(), &ledger).unwrap();
            assert!((dest.z - expected_z).abs() < 1e-4);
            mode.apply(ticket, &mut ledger);
        }
        assert_eq!(ledger.placed_count, 3);
        assert!((ledger.stack_height - 36.0).abs() < 1e-4);
    }

    #[test]
    fn round_robin_cycles_zones() {
        let mode = PlacementMode::Zone {
            zones: zones(),
            policy: ZonePolicy::RoundRobin,
        };
        let mut ledger = PlacementLedger::default();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let (_, ticket) = mode.next_destination(&det(), &ledger).unwrap();
            if let PlacementTicket::Zone(id) = &ticket {
                ids.push(id.clone());
            }
            mode.apply(ticket, &mut ledger);
        }
        assert_eq!(ids, ["left", "right", "left", "right"]);
    }

    #[test]
    fn least_occupied_balances() {
        let mode = PlacementMode::Zone {
            zones: zones(),
            policy: ZonePolicy::LeastOccupied,
        };
        let mut ledger = PlacementLedger::default();
        ledger.zone_counts.insert("left".into(), 2);
        let (dest, ticket) = mode.next_destination(&det(), &ledger).unwrap();
        assert_eq!(ticket, PlacementTicket::Zone("right".into()));
        assert!((dest.x - 100.0).abs() < 1e-4);
    }

    #[test]
    fn full_zone_is_rejected_without_mutation() {
        let mode = PlacementMode::Zone {
            zones: zones(),
            policy: ZonePolicy::Custom(Box::new(|_, _| "left".into())),
        };
        let mut ledger = PlacementLedger::default();
        ledger.zone_counts.insert("left".into(), 2);
        let before = ledger.clone();
        match mode.next_destination(&det(), &ledger) {
            Err(PickError::ZoneFull(id)) => assert_eq!(id, "left"),
            other => panic!("expected ZoneFull, got {other:?}"),
        }
        assert_eq!(ledger.zone_counts, before.zone_counts);
        assert_eq!(ledger.placed_count, before.placed_count);
    }

    #[test]
    fn unknown_custom_zone_is_a_state_error() {
        let mode = PlacementMode::Zone {
            zones: zones(),
            policy: ZonePolicy::Custom(Box::new(|_, _| "middle".into())),
        };
        let ledger = PlacementLedger::default();
        assert!(matches!(
            mode.next_destination(&det(), &ledger),
            Err(PickError::State(_))
        ));
    }

    #[test]
    fn slots_exhaust_with_cursor_intact() {
        let slots: Vec<WorkspacePoint> = (0..3)
            .map(|i| WorkspacePoint::new(i as f32 * 60.0 - 60.0, 250.0, 50.0))
            .collect();
        let mode = PlacementMode::Slot { slots };
        let mut ledger = PlacementLedger::default();
        for i in 0..3 {
            let (_, ticket) = mode.next_destination(&det(), &ledger).unwrap();
            mode.apply(ticket, &mut ledger);
            assert_eq!(ledger.next_slot_index, i + 1);
        }
        assert!(matches!(
            mode.next_destination(&det(), &ledger),
            Err(PickError::NoSlotsRemaining)
        ));
        assert_eq!(ledger.next_slot_index, 3);
    }
}
