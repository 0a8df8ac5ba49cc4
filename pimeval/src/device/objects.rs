//! Object table

// Imports
use {
	super::{cores::CoreIdx, Layout},
	crate::{
		data_type::DataType,
		error::{PimError, PimResult},
	},
	std::{
		collections::{btree_map, BTreeMap},
		fmt,
		ops::Range,
	},
};

/// Object identifier
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ObjId(i32);

impl ObjId {
	/// Reserved identifier that never refers to an object
	pub const INVALID: Self = Self(-1);

	/// Returns if this is a valid identifier
	pub const fn is_valid(self) -> bool {
		self.0 >= 0
	}
}

impl fmt::Display for ObjId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A contiguous run of an object's elements held by one core
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Region {
	/// Core
	pub core_idx: CoreIdx,

	/// First row
	pub row: u32,

	/// Number of rows
	pub num_rows: u32,

	/// Index of the first element
	pub elem_begin: u64,

	/// Number of elements
	pub num_elements: u64,
}

impl Region {
	/// Returns the element index range of this region
	pub fn elements(&self) -> Range<u64> {
		self.elem_begin..self.elem_begin + self.num_elements
	}
}

/// An object resident on the device
#[derive(Clone, Debug)]
pub struct Object {
	/// Data type
	pub data_type: DataType,

	/// Layout
	pub layout: Layout,

	/// Regions, in element order.
	///
	/// Empty for global buffers.
	pub regions: Vec<Region>,

	/// Whether this is the global buffer
	pub is_buffer: bool,

	/// Element bits, truncated to the data type's width
	pub data: Vec<u64>,
}

impl Object {
	/// Returns the number of elements
	pub(crate) fn len(&self) -> u64 {
		self.data.len() as u64
	}
}

/// Reference to another object
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Reference {
	/// Referenced object
	pub base: ObjId,

	/// Kind
	pub kind: RefKind,
}

/// Reference kind
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum RefKind {
	/// Elements read and write as the bitwise negation of the base's
	DualContact,

	/// Elements are the `begin..end` range of the base's
	Ranged { begin: u64, end: u64 },
}

/// Object table entry
#[derive(Clone, Debug)]
pub enum Entry {
	Object(Object),
	Reference(Reference),
}

/// Object table
#[derive(Clone, Debug, Default)]
pub struct Objects {
	/// All entries, by id
	entries: BTreeMap<ObjId, Entry>,

	/// Next id to hand out
	next_id: i32,
}

impl Objects {
	/// Creates an empty object table
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts an entry under a fresh id
	pub fn insert(&mut self, entry: Entry) -> PimResult<ObjId> {
		let id = ObjId(self.next_id);
		self.next_id = self
			.next_id
			.checked_add(1)
			.ok_or_else(|| PimError::OutOfCapacity("Object identifiers exhausted".to_owned()))?;

		match self.entries.entry(id) {
			btree_map::Entry::Vacant(entry_slot) => {
				entry_slot.insert(entry);
				Ok(id)
			},
			btree_map::Entry::Occupied(_) => unreachable!("Object ids are never reused"),
		}
	}

	/// Returns an entry
	pub fn get(&self, id: ObjId) -> PimResult<&Entry> {
		self.entries.get(&id).ok_or(PimError::ObjectNotFound(id))
	}

	/// Returns a non-reference object
	pub fn object(&self, id: ObjId) -> PimResult<&Object> {
		match self.get(id)? {
			Entry::Object(obj) => Ok(obj),
			Entry::Reference(_) => Err(PimError::InvalidReference(format!("{id} is a reference"))),
		}
	}

	/// Returns a non-reference object, mutably
	pub fn object_mut(&mut self, id: ObjId) -> PimResult<&mut Object> {
		match self.entries.get_mut(&id) {
			Some(Entry::Object(obj)) => Ok(obj),
			Some(Entry::Reference(_)) => Err(PimError::InvalidReference(format!("{id} is a reference"))),
			None => Err(PimError::ObjectNotFound(id)),
		}
	}

	/// Removes an entry along with every reference to it.
	///
	/// Returns the removed entry and the ids of the removed references.
	pub fn remove(&mut self, id: ObjId) -> PimResult<(Entry, Vec<ObjId>)> {
		let entry = self.entries.remove(&id).ok_or(PimError::ObjectNotFound(id))?;

		let dependents = self
			.entries
			.iter()
			.filter(|(_, entry)| matches!(entry, Entry::Reference(reference) if reference.base == id))
			.map(|(&ref_id, _)| ref_id)
			.collect::<Vec<_>>();
		for ref_id in &dependents {
			self.entries.remove(ref_id);
		}

		Ok((entry, dependents))
	}

	/// Returns the number of entries
	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

#[cfg(test)]
mod tests {
	use {super::*, crate::device::Orientation};

	fn object(len: usize) -> Entry {
		Entry::Object(Object {
			data_type: DataType::Int32,
			layout:    Layout {
				orientation:   Orientation::V,
				single_region: false,
			},
			regions:   vec![],
			is_buffer: false,
			data:      vec![0; len],
		})
	}

	#[test]
	fn ids_are_never_reused() {
		let mut objects = Objects::new();
		let a = objects.insert(object(4)).expect("Unable to insert");
		objects.remove(a).expect("Unable to remove");
		let b = objects.insert(object(4)).expect("Unable to insert");

		assert_ne!(a, b);
		assert!(matches!(objects.get(a), Err(PimError::ObjectNotFound(id)) if id == a));
		assert!(!ObjId::INVALID.is_valid());
		assert!(matches!(objects.get(ObjId::INVALID), Err(PimError::ObjectNotFound(_))));
	}

	#[test]
	fn removing_removes_references() {
		let mut objects = Objects::new();
		let base = objects.insert(object(4)).expect("Unable to insert");
		let reference = objects
			.insert(Entry::Reference(Reference {
				base,
				kind: RefKind::DualContact,
			}))
			.expect("Unable to insert");

		assert!(objects.object(reference).is_err());
		let (_, dependents) = objects.remove(base).expect("Unable to remove");
		assert_eq!(dependents, [reference]);
		assert_eq!(objects.len(), 0);
	}
}
