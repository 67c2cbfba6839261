// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Names of runtime types and members the analysis treats specially.

pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";
pub const JAVA_LANG_STRING: &str = "java.lang.String";
pub const JAVA_LANG_STRING_BUILDER: &str = "java.lang.StringBuilder";
pub const JAVA_LANG_STRING_BUFFER: &str = "java.lang.StringBuffer";
pub const JAVA_LANG_THROWABLE: &str = "java.lang.Throwable";
pub const JAVA_LANG_SYSTEM: &str = "java.lang.System";
pub const JAVA_LANG_CLONEABLE: &str = "java.lang.Cloneable";
pub const JAVA_IO_SERIALIZABLE: &str = "java.io.Serializable";

pub const CLINIT_SUBSIG: &str = "void <clinit>()";
pub const INIT_NAME: &str = "<init>";
pub const ARRAYCOPY_SUBSIG: &str = "void arraycopy(java.lang.Object,int,java.lang.Object,int,int)";
