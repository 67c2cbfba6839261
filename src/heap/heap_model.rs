// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The heap abstraction: how allocation sites map to abstract objects.

use std::collections::{HashMap, HashSet};

use log::*;
use once_cell::sync::OnceCell;

use crate::error::{PtaError, Result};
use crate::ir::known_names;
use crate::ir::{AllocKind, AllocSiteId, MethodId, Program, TypeId};
use crate::util::index_vec::IndexVec;
use crate::util::options::AnalysisOptions;

crate::newtype_index! {
    /// An abstract heap object.
    pub struct ObjId;
}

#[derive(Debug)]
pub enum Obj {
    /// The objects allocated at one site.
    Alloc(AllocSiteId),
    /// Several allocation sites represented by one object.
    Merged(MergedObj),
    /// An object without an allocation site, created by a plugin.
    Mock { description: String, ty: TypeId },
}

/// An object standing for all allocations of one kind.
#[derive(Debug)]
pub struct MergedObj {
    pub description: String,
    pub ty: TypeId,
    /// The first allocation site merged into this object. Set once.
    representative: OnceCell<AllocSiteId>,
}

impl MergedObj {
    fn new(description: String, ty: TypeId) -> Self {
        MergedObj {
            description,
            ty,
            representative: OnceCell::new(),
        }
    }

    /// Records `site` as merged into this object. Only the first site becomes
    /// the representative.
    pub fn add(&self, site: AllocSiteId) {
        let _ = self.representative.set(site);
    }

    pub fn representative(&self) -> Option<AllocSiteId> {
        self.representative.get().copied()
    }
}

impl Obj {
    pub fn ty(&self, program: &Program) -> TypeId {
        match self {
            Obj::Alloc(site) => program.alloc_site(*site).ty,
            Obj::Merged(merged) => merged.ty,
            Obj::Mock { ty, .. } => *ty,
        }
    }

    /// The method containing the allocation, if any.
    pub fn container(&self, program: &Program) -> Option<MethodId> {
        match self {
            Obj::Alloc(site) => Some(program.alloc_site(*site).container),
            Obj::Merged(merged) => merged
                .representative()
                .map(|site| program.alloc_site(site).container),
            Obj::Mock { .. } => None,
        }
    }

    pub fn alloc_site(&self) -> Option<AllocSiteId> {
        match self {
            Obj::Alloc(site) => Some(*site),
            Obj::Merged(merged) => merged.representative(),
            Obj::Mock { .. } => None,
        }
    }

    pub fn display(&self, program: &Program) -> String {
        match self {
            Obj::Alloc(site) => program.alloc_site_display(*site),
            Obj::Merged(merged) => merged.description.clone(),
            Obj::Mock { description, .. } => format!("<Mock {}>", description),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum MergeKey {
    StringConstants,
    /// Instances of a string type, keyed by that type.
    StringObjects(TypeId),
    /// Instances of a throwable type, keyed by that type.
    Exceptions(TypeId),
}

/// Maps allocation sites to abstract objects, applying the merging policies
/// enabled in the options.
#[derive(Debug)]
pub struct HeapModel {
    objs: IndexVec<ObjId, Obj>,
    site_objs: HashMap<AllocSiteId, ObjId>,
    merged_objs: HashMap<MergeKey, ObjId>,
    mock_objs: HashMap<String, ObjId>,

    merge_string_constants: bool,
    /// String types whose instances are merged per type.
    merged_string_types: HashSet<TypeId>,
    /// `java.lang.Throwable`, if exception objects are merged.
    throwable: Option<TypeId>,
}

impl HeapModel {
    /// Creates the heap model, failing if a merging policy needs a runtime
    /// type the program does not declare.
    pub fn new(program: &Program, options: &AnalysisOptions) -> Result<Self> {
        let mut merged_string_types = HashSet::new();
        if options.merge_string_objects {
            let string = program
                .class_by_name(known_names::JAVA_LANG_STRING)
                .ok_or(PtaError::MissingRuntimeType(known_names::JAVA_LANG_STRING))?;
            merged_string_types.insert(string);
            for name in [known_names::JAVA_LANG_STRING_BUILDER, known_names::JAVA_LANG_STRING_BUFFER] {
                match program.class_by_name(name) {
                    Some(ty) => {
                        merged_string_types.insert(ty);
                    }
                    None => debug!("{} is absent, its objects are not merged", name),
                }
            }
        }
        let throwable = if options.merge_exception_objects {
            Some(
                program
                    .class_by_name(known_names::JAVA_LANG_THROWABLE)
                    .ok_or(PtaError::MissingRuntimeType(known_names::JAVA_LANG_THROWABLE))?,
            )
        } else {
            None
        };

        Ok(HeapModel {
            objs: IndexVec::new(),
            site_objs: HashMap::new(),
            merged_objs: HashMap::new(),
            mock_objs: HashMap::new(),
            merge_string_constants: options.merge_string_constants,
            merged_string_types,
            throwable,
        })
    }

    /// Returns the abstract object for the objects allocated at `site`.
    pub fn get_obj(&mut self, program: &Program, site: AllocSiteId) -> ObjId {
        if let Some(obj) = self.site_objs.get(&site) {
            return *obj;
        }
        let obj = match self.merge_key(program, site) {
            Some(key) => {
                let ty = program.alloc_site(site).ty;
                let objs = &mut self.objs;
                let obj = *self.merged_objs.entry(key).or_insert_with(|| {
                    let description = match key {
                        MergeKey::StringConstants => "<Merged string constants>".to_string(),
                        _ => format!("<Merged {}>", program.type_name(ty)),
                    };
                    objs.push(Obj::Merged(MergedObj::new(description, ty)))
                });
                if let Obj::Merged(merged) = &self.objs[obj] {
                    merged.add(site);
                }
                obj
            }
            None => self.objs.push(Obj::Alloc(site)),
        };
        self.site_objs.insert(site, obj);
        obj
    }

    fn merge_key(&self, program: &Program, site: AllocSiteId) -> Option<MergeKey> {
        let alloc = program.alloc_site(site);
        match alloc.kind {
            AllocKind::StringConstant(_) => {
                return self.merge_string_constants.then_some(MergeKey::StringConstants);
            }
            AllocKind::Array => return None,
            AllocKind::Object => {}
        }
        if self.merged_string_types.contains(&alloc.ty) {
            return Some(MergeKey::StringObjects(alloc.ty));
        }
        match self.throwable {
            Some(throwable) if program.is_subtype(alloc.ty, throwable) => {
                Some(MergeKey::Exceptions(alloc.ty))
            }
            _ => None,
        }
    }

    /// Returns the mock object described by `description`, creating it with
    /// type `ty` on first request.
    pub fn mock_obj(&mut self, description: &str, ty: TypeId) -> ObjId {
        if let Some(obj) = self.mock_objs.get(description) {
            return *obj;
        }
        let obj = self.objs.push(Obj::Mock {
            description: description.to_string(),
            ty,
        });
        self.mock_objs.insert(description.to_string(), obj);
        obj
    }

    /// The object already created for `site`, without creating one.
    pub fn find_obj(&self, site: AllocSiteId) -> Option<ObjId> {
        self.site_objs.get(&site).copied()
    }

    #[inline]
    pub fn obj(&self, obj: ObjId) -> &Obj {
        &self.objs[obj]
    }

    #[inline]
    pub fn obj_type(&self, program: &Program, obj: ObjId) -> TypeId {
        self.objs[obj].ty(program)
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }

    pub fn objs(&self) -> impl Iterator<Item = (ObjId, &Obj)> + '_ {
        self.objs.iter_enumerated()
    }
}
