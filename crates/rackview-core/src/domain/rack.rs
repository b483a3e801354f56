//! Rack-unit occupancy and equipment placement.
//!
//! A rack is a column of fixed-height *rack units* numbered `1..=rack_units`.
//! Each piece of equipment declares a `position` (its first unit) and a
//! `rackUnits` span.  [`RackAllocator`] owns the per-unit availability table of
//! one rack, decides whether a piece of equipment fits, and converts a
//! placement into pixel geometry.
//!
//! # Numbering direction
//!
//! Racks number their units either top-down (ascending, the default) or
//! bottom-up (`rackUnitsNumberingDescending = true`).  Both directions share a
//! single formula for the display row of a placement:
//!
//! ```text
//! draw_row = ascending ? position - 1 : rack_units - position - (span - 1)
//! y        = unit_height * draw_row + unit_spacing * draw_row
//! ```

use serde::Serialize;
use thiserror::Error;

use super::device::{AttributeValue, DeviceId, ModelObject};

/// Equipment attribute holding the first occupied unit (0 = not placed).
pub const POSITION_ATTRIBUTE: &str = "position";
/// Attribute holding the unit count of a rack, or the span of equipment.
pub const RACK_UNITS_ATTRIBUTE: &str = "rackUnits";
/// Rack attribute selecting bottom-up numbering.  Absent means ascending.
pub const DESCENDING_ATTRIBUTE: &str = "rackUnitsNumberingDescending";
/// Largest rack a rack object may declare.
pub const MAX_RACK_UNITS: u32 = u16::MAX as u32;

/// A required numeric attribute is absent or has the wrong type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AttributeError {
    #[error("the attribute {attribute} does not exist in {object}")]
    Missing { attribute: String, object: String },

    #[error("the attribute {attribute} in {object} is of type {actual}, expected Integer")]
    WrongType {
        attribute: String,
        object: String,
        actual: &'static str,
    },
}

/// A placement violates the physical constraints of the rack.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("the position {position} set in {object} must be greater than or equal to zero")]
    NegativePosition { position: i64, object: String },

    #[error("the position {position} set in {object} is greater than the number of rack units ({rack_units})")]
    PositionOutOfBounds {
        position: i64,
        rack_units: u32,
        object: String,
    },

    #[error("the rack units ({span}) set in {object} must be between 1 and {rack_units}")]
    SpanOutOfBounds {
        span: i64,
        rack_units: u32,
        object: String,
    },

    #[error("{object} needs {span} rack units from position {position}, past the last unit ({rack_units})")]
    DoesNotFit {
        position: i64,
        span: i64,
        rack_units: u32,
        object: String,
    },

    #[error("the position {unit} set in {object} is used by {occupant}")]
    UnitOccupied {
        unit: u32,
        object: String,
        occupant: String,
    },

    #[error(
        "the rack units ({rack_units}) set in {object} must be between 1 and {max}",
        max = MAX_RACK_UNITS
    )]
    InvalidRackUnits { rack_units: i64, object: String },

    #[error("{object} is already placed in the rack")]
    AlreadyPlaced { object: String },

    #[error("equipment {0} is not placed in the rack")]
    NotPlaced(DeviceId),
}

/// Any reason a piece of equipment cannot be racked.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RackError {
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Outcome of a successful fit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// The equipment fits at `position` and occupies `span` units.
    Fits { position: u32, span: u32 },
    /// Position 0: the equipment is in the rack but not placed on any unit.
    Unplaced,
}

/// One rack unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RackUnit {
    /// 1-based unit number.
    pub index: u32,
    pub available: bool,
    /// Id of the equipment holding the unit, if any.
    pub occupant: Option<DeviceId>,
}

/// Pixel dimensions of one rack unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RackGeometry {
    pub unit_width: i32,
    pub unit_height: i32,
    pub unit_spacing: i32,
}

impl RackGeometry {
    /// The same geometry with negative dimensions raised to zero.
    pub fn clamped(self) -> Self {
        Self {
            unit_width: self.unit_width.max(0),
            unit_height: self.unit_height.max(0),
            unit_spacing: self.unit_spacing.max(0),
        }
    }
}

impl Default for RackGeometry {
    fn default() -> Self {
        Self {
            unit_width: 300,
            unit_height: 20,
            unit_spacing: 2,
        }
    }
}

/// Where a placed piece of equipment is drawn.
///
/// Derived from the allocator state each time it is requested; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentPlacement {
    pub device: DeviceId,
    pub name: String,
    pub position: u32,
    pub rack_units: u32,
    pub ascending: bool,
    /// 0-based display row of the topmost occupied unit.
    pub draw_row: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A unit number and the Y offset of its row, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitRow {
    pub unit: u32,
    pub y: i32,
}

/// Serializable view of a rack for the painter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RackSnapshot {
    pub rack_units: u32,
    pub ascending: bool,
    pub geometry: RackGeometry,
    pub height: i32,
    pub units: Vec<RackUnit>,
    pub placements: Vec<EquipmentPlacement>,
    pub used_units: u32,
    pub usage_percent: f64,
}

#[derive(Debug, Clone)]
struct Placed {
    id: DeviceId,
    label: String,
    name: String,
    position: u32,
    span: u32,
}

/// The occupancy table of one rack.
///
/// Owned exclusively by the render that created it.
#[derive(Debug, Clone)]
pub struct RackAllocator {
    rack_units: u32,
    ascending: bool,
    geometry: RackGeometry,
    units: Vec<RackUnit>,
    /// Placed equipment in placement order.
    placed: Vec<Placed>,
}

impl RackAllocator {
    /// Creates an empty rack with `rack_units` available units.
    ///
    /// `rack_units` is capped at [`MAX_RACK_UNITS`] and negative geometry is
    /// clamped to zero.
    pub fn new(rack_units: u32, ascending: bool, geometry: RackGeometry) -> Self {
        let rack_units = rack_units.min(MAX_RACK_UNITS);
        let geometry = geometry.clamped();
        let units = (1..=rack_units)
            .map(|index| RackUnit {
                index,
                available: true,
                occupant: None,
            })
            .collect();
        Self {
            rack_units,
            ascending,
            geometry,
            units,
            placed: Vec::new(),
        }
    }

    /// Creates an empty allocator from a rack object's `rackUnits` and
    /// `rackUnitsNumberingDescending` attributes.
    pub fn from_rack(rack: &ModelObject, geometry: RackGeometry) -> Result<Self, RackError> {
        let rack_units = integer_attribute(rack, RACK_UNITS_ATTRIBUTE)?;
        if rack_units <= 0 || rack_units > i64::from(MAX_RACK_UNITS) {
            return Err(ValidationError::InvalidRackUnits {
                rack_units,
                object: rack.to_string(),
            }
            .into());
        }
        let descending = rack.boolean(DESCENDING_ATTRIBUTE).unwrap_or(false);
        Ok(Self::new(rack_units as u32, !descending, geometry))
    }

    pub fn rack_units(&self) -> u32 {
        self.rack_units
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn geometry(&self) -> RackGeometry {
        self.geometry
    }

    pub fn units(&self) -> &[RackUnit] {
        &self.units
    }

    /// Returns unit `index` (1-based).
    pub fn unit(&self, index: u32) -> Option<&RackUnit> {
        index.checked_sub(1).and_then(|i| self.units.get(i as usize))
    }

    // ── Fit validation ────────────────────────────────────────────────────────

    /// Validates whether `equipment` fits in the rack.
    ///
    /// `position_override` replaces the equipment's own `position` value.
    /// The checks run in a fixed order and the first failure is returned:
    /// attribute presence and type, position sign, position bound, span
    /// bound, span end, unit availability.  Position 0 is not an error; it
    /// yields [`Fit::Unplaced`].
    pub fn check_rackable(
        &self,
        equipment: &ModelObject,
        position_override: Option<i64>,
    ) -> Result<Fit, RackError> {
        self.check(equipment, position_override, None)
    }

    /// `true` only when [`check_rackable`](Self::check_rackable) returns
    /// [`Fit::Fits`].
    pub fn is_rackable(&self, equipment: &ModelObject, position_override: Option<i64>) -> bool {
        matches!(
            self.check_rackable(equipment, position_override),
            Ok(Fit::Fits { .. })
        )
    }

    /// Like [`check_rackable`](Self::check_rackable) at `new_position`, but
    /// units currently held by `equipment` itself are not conflicts.
    pub fn can_be_moved(
        &self,
        equipment: &ModelObject,
        new_position: i64,
    ) -> Result<Fit, RackError> {
        self.check(equipment, Some(new_position), Some(&equipment.id))
    }

    fn check(
        &self,
        equipment: &ModelObject,
        position_override: Option<i64>,
        ignore: Option<&str>,
    ) -> Result<Fit, RackError> {
        let declared = integer_attribute(equipment, POSITION_ATTRIBUTE)?;
        let span = integer_attribute(equipment, RACK_UNITS_ATTRIBUTE)?;
        let position = position_override.unwrap_or(declared);
        let rack_units = self.rack_units;

        if position < 0 {
            return Err(ValidationError::NegativePosition {
                position,
                object: equipment.to_string(),
            }
            .into());
        }
        if position > i64::from(rack_units) {
            return Err(ValidationError::PositionOutOfBounds {
                position,
                rack_units,
                object: equipment.to_string(),
            }
            .into());
        }
        if position == 0 {
            return Ok(Fit::Unplaced);
        }
        if span < 1 || span > i64::from(rack_units) {
            return Err(ValidationError::SpanOutOfBounds {
                span,
                rack_units,
                object: equipment.to_string(),
            }
            .into());
        }
        if position + span - 1 > i64::from(rack_units) {
            return Err(ValidationError::DoesNotFit {
                position,
                span,
                rack_units,
                object: equipment.to_string(),
            }
            .into());
        }

        // Both values are now within 1..=rack_units.
        let (position, span) = (position as u32, span as u32);
        for index in position..position + span {
            let unit = &self.units[(index - 1) as usize];
            let own = ignore.is_some() && unit.occupant.as_deref() == ignore;
            if !unit.available && !own {
                return Err(ValidationError::UnitOccupied {
                    unit: index,
                    object: equipment.to_string(),
                    occupant: self.occupant_label(unit),
                }
                .into());
            }
        }
        Ok(Fit::Fits { position, span })
    }

    // ── Occupancy ─────────────────────────────────────────────────────────────

    /// Marks the units of `equipment` unavailable.
    ///
    /// Returns `Ok(None)` for equipment at position 0, which stays in the rack
    /// without occupying any unit.
    pub fn add_equipment(
        &mut self,
        equipment: &ModelObject,
    ) -> Result<Option<EquipmentPlacement>, RackError> {
        if self.placed.iter().any(|p| p.id == equipment.id) {
            return Err(ValidationError::AlreadyPlaced {
                object: equipment.to_string(),
            }
            .into());
        }
        match self.check_rackable(equipment, None)? {
            Fit::Unplaced => Ok(None),
            Fit::Fits { position, span } => {
                self.occupy(equipment, position, span);
                Ok(self.placement(&equipment.id))
            }
        }
    }

    /// Releases every unit held by the equipment with id `device`.
    pub fn free_equipment_rack_units(&mut self, device: &str) -> Result<(), RackError> {
        let idx = self
            .placed
            .iter()
            .position(|p| p.id == device)
            .ok_or_else(|| ValidationError::NotPlaced(device.to_string()))?;
        let placed = self.placed.remove(idx);
        for index in placed.position..placed.position + placed.span {
            let unit = &mut self.units[(index - 1) as usize];
            unit.available = true;
            unit.occupant = None;
        }
        Ok(())
    }

    /// Moves placed equipment to `new_position`.
    ///
    /// Moving to position 0 frees the equipment's units and returns `Ok(None)`.
    /// On error the rack is left unchanged.
    pub fn move_equipment(
        &mut self,
        equipment: &ModelObject,
        new_position: i64,
    ) -> Result<Option<EquipmentPlacement>, RackError> {
        if !self.placed.iter().any(|p| p.id == equipment.id) {
            return Err(ValidationError::NotPlaced(equipment.id.clone()).into());
        }
        let fit = self.can_be_moved(equipment, new_position)?;
        self.free_equipment_rack_units(&equipment.id)?;
        match fit {
            Fit::Unplaced => Ok(None),
            Fit::Fits { position, span } => {
                self.occupy(equipment, position, span);
                Ok(self.placement(&equipment.id))
            }
        }
    }

    fn occupy(&mut self, equipment: &ModelObject, position: u32, span: u32) {
        for index in position..position + span {
            let unit = &mut self.units[(index - 1) as usize];
            unit.available = false;
            unit.occupant = Some(equipment.id.clone());
        }
        self.placed.push(Placed {
            id: equipment.id.clone(),
            label: equipment.to_string(),
            name: equipment.name.clone(),
            position,
            span,
        });
    }

    fn occupant_label(&self, unit: &RackUnit) -> String {
        unit.occupant
            .as_deref()
            .and_then(|id| self.placed.iter().find(|p| p.id == id))
            .map(|p| p.label.clone())
            .unwrap_or_else(|| "another equipment".to_string())
    }

    // ── Geometry ──────────────────────────────────────────────────────────────

    /// 0-based display row of equipment at `position` spanning `span` units.
    pub fn draw_row(&self, position: u32, span: u32) -> u32 {
        if self.ascending {
            position.saturating_sub(1)
        } else {
            self.rack_units
                .saturating_sub(position)
                .saturating_sub(span.saturating_sub(1))
        }
    }

    /// Y offset of display row `row`.  Saturates at `i32::MAX`.
    pub fn row_offset(&self, row: u32) -> i32 {
        let row = i32::try_from(row).unwrap_or(i32::MAX);
        self.geometry
            .unit_height
            .saturating_mul(row)
            .saturating_add(self.geometry.unit_spacing.saturating_mul(row))
    }

    /// Pixel height of `span` consecutive units.  Saturates at `i32::MAX`.
    pub fn span_height(&self, span: u32) -> i32 {
        let span = i32::try_from(span).unwrap_or(i32::MAX);
        let gaps = span.saturating_sub(1).max(0);
        self.geometry
            .unit_height
            .saturating_mul(span)
            .saturating_add(self.geometry.unit_spacing.saturating_mul(gaps))
    }

    /// Pixel height of the whole rack.
    pub fn height(&self) -> i32 {
        self.span_height(self.rack_units)
    }

    /// Current placement of the equipment with id `device`.
    pub fn placement(&self, device: &str) -> Option<EquipmentPlacement> {
        self.placed
            .iter()
            .find(|p| p.id == device)
            .map(|p| self.placement_of(p))
    }

    /// Every placement, in the order the equipment was added.
    pub fn placements(&self) -> Vec<EquipmentPlacement> {
        self.placed.iter().map(|p| self.placement_of(p)).collect()
    }

    fn placement_of(&self, placed: &Placed) -> EquipmentPlacement {
        let draw_row = self.draw_row(placed.position, placed.span);
        EquipmentPlacement {
            device: placed.id.clone(),
            name: placed.name.clone(),
            position: placed.position,
            rack_units: placed.span,
            ascending: self.ascending,
            draw_row,
            x: 0,
            y: self.row_offset(draw_row),
            width: self.geometry.unit_width,
            height: self.span_height(placed.span),
        }
    }

    /// Changes the unit width; placements pick it up on the next request.
    pub fn resize(&mut self, unit_width: i32) {
        self.geometry.unit_width = unit_width.max(0);
    }

    /// Unit numbers with their row offsets, top row first.
    pub fn unit_rows(&self) -> Vec<UnitRow> {
        (0..self.rack_units)
            .map(|row| UnitRow {
                unit: if self.ascending { row + 1 } else { self.rack_units - row },
                y: self.row_offset(row),
            })
            .collect()
    }

    /// Sum of the spans of every placed equipment.
    pub fn rack_units_counter(&self) -> u32 {
        self.placed.iter().map(|p| p.span).sum()
    }

    pub fn usage_percent(&self) -> f64 {
        if self.rack_units == 0 {
            return 0.0;
        }
        f64::from(self.rack_units_counter()) * 100.0 / f64::from(self.rack_units)
    }

    pub fn snapshot(&self) -> RackSnapshot {
        RackSnapshot {
            rack_units: self.rack_units,
            ascending: self.ascending,
            geometry: self.geometry,
            height: self.height(),
            units: self.units.clone(),
            placements: self.placements(),
            used_units: self.rack_units_counter(),
            usage_percent: self.usage_percent(),
        }
    }

    // ── Audit ─────────────────────────────────────────────────────────────────

    /// Tries to place every item of `equipment` into an empty rack of the
    /// same shape and returns every problem found, in equipment order.
    ///
    /// Unlike [`add_equipment`](Self::add_equipment) this never stops at the
    /// first failure.  `self` is not modified.
    pub fn audit(&self, equipment: &[ModelObject]) -> Vec<RackError> {
        let mut scratch = RackAllocator::new(self.rack_units, self.ascending, self.geometry);
        equipment
            .iter()
            .filter_map(|item| scratch.add_equipment(item).err())
            .collect()
    }
}

fn integer_attribute(object: &ModelObject, attribute: &str) -> Result<i64, AttributeError> {
    match object.attribute(attribute) {
        Some(AttributeValue::Integer(v)) => Ok(*v),
        Some(other) => Err(AttributeError::WrongType {
            attribute: attribute.to_string(),
            object: object.to_string(),
            actual: other.type_name(),
        }),
        None => Err(AttributeError::Missing {
            attribute: attribute.to_string(),
            object: object.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn equipment(id: &str, position: i64, span: i64) -> ModelObject {
        ModelObject::new(id, "Router", id.to_uppercase())
            .with_attribute(POSITION_ATTRIBUTE, AttributeValue::Integer(position))
            .with_attribute(RACK_UNITS_ATTRIBUTE, AttributeValue::Integer(span))
    }

    fn rack(units: u32) -> RackAllocator {
        RackAllocator::new(units, true, RackGeometry::default())
    }

    // ── check_rackable ────────────────────────────────────────────────────────

    #[test]
    fn test_check_rackable_reports_missing_position() {
        let alloc = rack(4);
        let eq = ModelObject::new("e1", "Router", "R1")
            .with_attribute(RACK_UNITS_ATTRIBUTE, AttributeValue::Integer(1));
        assert_eq!(
            alloc.check_rackable(&eq, None),
            Err(RackError::Attribute(AttributeError::Missing {
                attribute: "position".into(),
                object: "R1 [Router]".into(),
            }))
        );
    }

    #[test]
    fn test_check_rackable_reports_wrong_attribute_type() {
        let alloc = rack(4);
        let eq = equipment("e1", 1, 1)
            .with_attribute(RACK_UNITS_ATTRIBUTE, AttributeValue::Text("2".into()));
        assert!(matches!(
            alloc.check_rackable(&eq, None),
            Err(RackError::Attribute(AttributeError::WrongType { actual: "String", .. }))
        ));
    }

    #[test]
    fn test_position_zero_is_unplaced_not_an_error() {
        let alloc = rack(4);
        assert_eq!(alloc.check_rackable(&equipment("e1", 0, 2), None), Ok(Fit::Unplaced));
        assert!(!alloc.is_rackable(&equipment("e1", 0, 2), None));
    }

    #[test]
    fn test_check_rackable_rejects_negative_and_out_of_range_positions() {
        let alloc = rack(4);
        assert!(matches!(
            alloc.check_rackable(&equipment("e1", -1, 1), None),
            Err(RackError::Validation(ValidationError::NegativePosition { position: -1, .. }))
        ));
        assert!(matches!(
            alloc.check_rackable(&equipment("e1", 5, 1), None),
            Err(RackError::Validation(ValidationError::PositionOutOfBounds { position: 5, .. }))
        ));
    }

    #[test]
    fn test_check_rackable_rejects_span_outside_rack() {
        let alloc = rack(4);
        assert!(matches!(
            alloc.check_rackable(&equipment("e1", 1, 0), None),
            Err(RackError::Validation(ValidationError::SpanOutOfBounds { .. }))
        ));
        assert!(matches!(
            alloc.check_rackable(&equipment("e1", 1, 5), None),
            Err(RackError::Validation(ValidationError::SpanOutOfBounds { .. }))
        ));
        assert!(matches!(
            alloc.check_rackable(&equipment("e1", 3, 3), None),
            Err(RackError::Validation(ValidationError::DoesNotFit { .. }))
        ));
    }

    #[test]
    fn test_position_override_replaces_attribute() {
        let alloc = rack(4);
        let eq = equipment("e1", 0, 1);
        assert_eq!(
            alloc.check_rackable(&eq, Some(4)),
            Ok(Fit::Fits { position: 4, span: 1 })
        );
    }

    #[test]
    fn test_four_unit_rack_example() {
        // Arrange
        let mut alloc = rack(4);
        alloc.add_equipment(&equipment("a", 1, 2)).unwrap();

        // Act + Assert
        assert!(!alloc.is_rackable(&equipment("b", 2, 1), None));
        assert!(alloc.is_rackable(&equipment("c", 3, 2), None));
    }

    #[test]
    fn test_occupied_unit_names_the_occupant() {
        let mut alloc = rack(4);
        alloc.add_equipment(&equipment("a", 1, 2)).unwrap();
        let err = alloc.check_rackable(&equipment("b", 2, 1), None).unwrap_err();
        assert_eq!(err.to_string(), "the position 2 set in B [Router] is used by A [Router]");
    }

    // ── add / free / move ─────────────────────────────────────────────────────

    #[test]
    fn test_add_equipment_marks_span_unavailable() {
        let mut alloc = rack(6);
        alloc.add_equipment(&equipment("a", 2, 3)).unwrap();
        let taken: Vec<u32> = alloc
            .units()
            .iter()
            .filter(|u| !u.available)
            .map(|u| u.index)
            .collect();
        assert_eq!(taken, vec![2, 3, 4]);
        assert_eq!(alloc.unit(3).and_then(|u| u.occupant.clone()), Some("a".to_string()));
    }

    #[test]
    fn test_add_equipment_at_position_zero_occupies_nothing() {
        let mut alloc = rack(4);
        assert_eq!(alloc.add_equipment(&equipment("a", 0, 2)), Ok(None));
        assert!(alloc.units().iter().all(|u| u.available));
    }

    #[test]
    fn test_add_equipment_twice_is_rejected() {
        let mut alloc = rack(8);
        alloc.add_equipment(&equipment("a", 1, 1)).unwrap();
        assert!(matches!(
            alloc.add_equipment(&equipment("a", 5, 1)),
            Err(RackError::Validation(ValidationError::AlreadyPlaced { .. }))
        ));
    }

    #[test]
    fn test_free_then_check_is_rackable_again() {
        let mut alloc = rack(4);
        let eq = equipment("a", 2, 2);
        alloc.add_equipment(&eq).unwrap();
        alloc.free_equipment_rack_units("a").unwrap();
        assert!(alloc.is_rackable(&eq, None));
    }

    #[test]
    fn test_free_unknown_equipment_fails() {
        let mut alloc = rack(4);
        assert_eq!(
            alloc.free_equipment_rack_units("ghost"),
            Err(RackError::Validation(ValidationError::NotPlaced("ghost".into())))
        );
    }

    #[test]
    fn test_can_be_moved_ignores_own_units() {
        let mut alloc = rack(6);
        let eq = equipment("a", 2, 3);
        alloc.add_equipment(&eq).unwrap();
        assert_eq!(alloc.can_be_moved(&eq, 3), Ok(Fit::Fits { position: 3, span: 3 }));
        assert!(!alloc.is_rackable(&eq, Some(3)));
    }

    #[test]
    fn test_can_be_moved_still_detects_other_occupants() {
        let mut alloc = rack(6);
        let a = equipment("a", 1, 2);
        alloc.add_equipment(&a).unwrap();
        alloc.add_equipment(&equipment("b", 4, 2)).unwrap();
        assert!(alloc.can_be_moved(&a, 3).is_err());
    }

    #[test]
    fn test_move_equipment_reoccupies_units() {
        let mut alloc = rack(6);
        let eq = equipment("a", 1, 2);
        alloc.add_equipment(&eq).unwrap();
        let moved = alloc.move_equipment(&eq, 2).unwrap().unwrap();
        assert_eq!(moved.position, 2);
        let taken: Vec<u32> = alloc
            .units()
            .iter()
            .filter(|u| !u.available)
            .map(|u| u.index)
            .collect();
        assert_eq!(taken, vec![2, 3]);
    }

    #[test]
    fn test_failed_move_leaves_rack_unchanged() {
        let mut alloc = rack(4);
        let a = equipment("a", 1, 2);
        alloc.add_equipment(&a).unwrap();
        alloc.add_equipment(&equipment("b", 3, 1)).unwrap();
        assert!(alloc.move_equipment(&a, 2).is_err());
        assert_eq!(alloc.placement("a").map(|p| p.position), Some(1));
    }

    // ── geometry ──────────────────────────────────────────────────────────────

    #[test]
    fn test_placement_geometry_ascending() {
        let mut alloc = rack(10);
        let p = alloc.add_equipment(&equipment("a", 3, 2)).unwrap().unwrap();
        assert_eq!(p.draw_row, 2);
        assert_eq!(p.y, 20 * 2 + 2 * 2);
        assert_eq!(p.height, 20 * 2 + 2);
        assert_eq!(p.width, 300);
    }

    #[test]
    fn test_placement_geometry_descending() {
        let mut alloc = RackAllocator::new(10, false, RackGeometry::default());
        let p = alloc.add_equipment(&equipment("a", 3, 2)).unwrap().unwrap();
        assert_eq!(p.draw_row, 10 - 3 - 1);
        assert_eq!(p.y, 22 * 6);
    }

    #[test]
    fn test_resize_updates_placement_width() {
        let mut alloc = rack(4);
        alloc.add_equipment(&equipment("a", 1, 1)).unwrap();
        alloc.resize(450);
        assert_eq!(alloc.placement("a").map(|p| p.width), Some(450));
    }

    #[test]
    fn test_unit_rows_follow_numbering_direction() {
        let asc = rack(3).unit_rows();
        let desc = RackAllocator::new(3, false, RackGeometry::default()).unit_rows();
        assert_eq!(asc.iter().map(|r| r.unit).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(desc.iter().map(|r| r.unit).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(desc[2].y, 44);
    }

    #[test]
    fn test_counter_and_usage() {
        let mut alloc = rack(10);
        alloc.add_equipment(&equipment("a", 1, 2)).unwrap();
        alloc.add_equipment(&equipment("b", 5, 3)).unwrap();
        assert_eq!(alloc.rack_units_counter(), 5);
        assert!((alloc.usage_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_rack_reads_numbering_direction() {
        let rack_obj = ModelObject::new("r", "Rack", "Rack 1")
            .with_attribute(RACK_UNITS_ATTRIBUTE, AttributeValue::Integer(42))
            .with_attribute(DESCENDING_ATTRIBUTE, AttributeValue::Boolean(true));
        let alloc = RackAllocator::from_rack(&rack_obj, RackGeometry::default()).unwrap();
        assert_eq!(alloc.rack_units(), 42);
        assert!(!alloc.is_ascending());
    }

    #[test]
    fn test_from_rack_rejects_zero_units() {
        let rack_obj = ModelObject::new("r", "Rack", "Rack 1")
            .with_attribute(RACK_UNITS_ATTRIBUTE, AttributeValue::Integer(0));
        assert!(matches!(
            RackAllocator::from_rack(&rack_obj, RackGeometry::default()),
            Err(RackError::Validation(ValidationError::InvalidRackUnits { .. }))
        ));
    }

    #[test]
    fn test_from_rack_rejects_units_above_the_limit() {
        let rack_obj = ModelObject::new("r", "Rack", "Rack 1")
            .with_attribute(RACK_UNITS_ATTRIBUTE, AttributeValue::Integer(i64::from(u32::MAX)));

        let err = RackAllocator::from_rack(&rack_obj, RackGeometry::default()).unwrap_err();

        assert!(matches!(
            err,
            RackError::Validation(ValidationError::InvalidRackUnits { rack_units, .. })
                if rack_units == i64::from(u32::MAX)
        ));
        assert!(err.to_string().contains("between 1 and 65535"));
    }

    #[test]
    fn test_from_rack_accepts_the_largest_rack() {
        let rack_obj = ModelObject::new("r", "Rack", "Rack 1").with_attribute(
            RACK_UNITS_ATTRIBUTE,
            AttributeValue::Integer(i64::from(MAX_RACK_UNITS)),
        );
        let alloc = RackAllocator::from_rack(&rack_obj, RackGeometry::default()).unwrap();
        assert_eq!(alloc.rack_units(), MAX_RACK_UNITS);
    }

    #[test]
    fn test_new_caps_rack_units() {
        let alloc = RackAllocator::new(u32::MAX, true, RackGeometry::default());
        assert_eq!(alloc.rack_units(), MAX_RACK_UNITS);
        assert_eq!(alloc.units().len(), MAX_RACK_UNITS as usize);
    }

    // ── geometry limits ───────────────────────────────────────────────────────

    #[test]
    fn test_huge_unit_height_saturates_instead_of_overflowing() {
        // Arrange
        let geometry = RackGeometry {
            unit_width: 300,
            unit_height: 30_000_000,
            unit_spacing: 2,
        };
        let mut alloc = RackAllocator::new(100, true, geometry);
        alloc.add_equipment(&equipment("a", 90, 10)).unwrap();

        // Act
        let snapshot = alloc.snapshot();

        // Assert
        assert_eq!(snapshot.height, i32::MAX);
        assert_eq!(snapshot.placements[0].y, i32::MAX);
        assert_eq!(snapshot.placements[0].height, 300_000_018);
    }

    #[test]
    fn test_row_offset_saturates_for_rows_beyond_i32() {
        let alloc = rack(4);
        assert_eq!(alloc.row_offset(u32::MAX), i32::MAX);
        assert_eq!(alloc.span_height(u32::MAX), i32::MAX);
    }

    #[test]
    fn test_negative_geometry_is_clamped_to_zero() {
        let geometry = RackGeometry {
            unit_width: -300,
            unit_height: -20,
            unit_spacing: -2,
        };
        let alloc = RackAllocator::new(4, true, geometry);

        assert_eq!(
            alloc.geometry(),
            RackGeometry {
                unit_width: 0,
                unit_height: 0,
                unit_spacing: 0,
            }
        );
        assert_eq!(alloc.height(), 0);
        assert_eq!(alloc.row_offset(3), 0);
    }

    // ── audit ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_audit_collects_every_issue() {
        let alloc = rack(4);
        let items = vec![
            equipment("a", 1, 2),
            equipment("b", 2, 1),
            ModelObject::new("c", "Switch", "C"),
            equipment("d", 9, 1),
            equipment("e", 3, 2),
        ];
        let issues = alloc.audit(&items);
        assert_eq!(issues.len(), 3);
        assert!(alloc.units().iter().all(|u| u.available));
    }
}
