//!
//! The Classes module contains the per-class metadata consulted by the lexicon.  [ClassInfo]
//! and [ClassRegistry] are re-exported.
//!

use std::collections::HashMap;

use super::key::{ClassSelector, Mask, TableId, TABLE_COUNT};

/// What the lexicon needs to know about one class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub name : String,
    /// Names differing only by case are distinct keys
    pub case_sensitive : bool,
    /// Objects of this class have tree-structured bodies, which can be fused, and a `?Name`
    /// model root
    pub tree_typed : bool,
    /// Per-key created/updated stamps are kept
    pub timestamps : bool,
    /// Subclass membership depends on the object body and must be recomputed after a rename
    pub has_constraints : bool,
}

impl ClassInfo {
    pub fn new(name : &str) -> Self {
        Self {
            name : name.to_string(),
            case_sensitive : false,
            tree_typed : false,
            timestamps : false,
            has_constraints : false,
        }
    }
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
    pub fn tree_typed(mut self) -> Self {
        self.tree_typed = true;
        self
    }
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }
    pub fn with_constraints(mut self) -> Self {
        self.has_constraints = true;
        self
    }

    /// Name of the synthetic model root record of a tree-typed class
    pub fn model_name(&self) -> String {
        format!("?{}", self.name)
    }
}

/// Metadata for all 256 classes, plus the named subclasses defined over them
#[derive(Clone, Debug)]
pub struct ClassRegistry {
    classes : Vec<ClassInfo>,
    subclasses : HashMap<String, ClassSelector>,
}

impl ClassRegistry {

    pub fn new() -> Self {
        let mut classes : Vec<ClassInfo> = (0..TABLE_COUNT).map(|t| ClassInfo::new(&format!("Class{t}"))).collect();
        classes[TableId::SYSTEM.index()] = ClassInfo::new("System").case_sensitive();
        classes[TableId::GLOBAL.index()] = ClassInfo::new("Global");
        classes[TableId::SESSION.index()] = ClassInfo::new("Session");
        classes[TableId::MODEL.index()] = ClassInfo::new("Model").case_sensitive();
        classes[TableId::MAIN_CLASSES.index()] = ClassInfo::new("MainClasses");
        Self {
            classes,
            subclasses : HashMap::new(),
        }
    }

    pub fn get(&self, table : TableId) -> &ClassInfo {
        &self.classes[table.index()]
    }

    pub fn define(&mut self, table : TableId, info : ClassInfo) {
        self.classes[table.index()] = info;
    }

    /// Finds a class by name, case-insensitively
    pub fn by_name(&self, name : &str) -> Option<TableId> {
        self.classes.iter().position(|info| info.name.eq_ignore_ascii_case(name)).map(|t| TableId(t as u8))
    }

    pub fn define_subclass(&mut self, name : &str, base : TableId, mask : Mask) {
        self.subclasses.insert(name.to_ascii_lowercase(), ClassSelector::Masked(base, mask));
    }

    /// Resolves a class or subclass name into a selector
    pub fn selector(&self, name : &str) -> Option<ClassSelector> {
        match self.subclasses.get(&name.to_ascii_lowercase()) {
            Some(sel) => Some(*sel),
            None => self.by_name(name).map(ClassSelector::Direct)
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
