//! The [cvt (Control Value Table)][cvt] table
//!
//! [cvt]: https://learn.microsoft.com/en-us/typography/opentype/spec/cvt

use std::collections::BTreeMap;

use write_fonts::{
    read::TopLevelTable,
    types::Tag,
    validate::{Validate, ValidationCtx},
    FontWrite, TableWriter,
};

use crate::{record::FontHintRecord, Result};

/// The control value table: a dense array of FWORD values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cvt {
    pub values: Vec<i16>,
}

impl TopLevelTable for Cvt {
    const TAG: Tag = Tag::new(b"cvt ");
}

impl Cvt {
    pub fn new(values: Vec<i16>) -> Self {
        Self { values }
    }

    /// Build a dense table from sparse `index -> value` entries.
    ///
    /// The table is as long as the largest index requires; indices without
    /// an entry are zero.
    pub fn from_sparse(entries: &BTreeMap<u16, i16>) -> Self {
        let len = entries
            .last_key_value()
            .map(|(index, _)| *index as usize + 1)
            .unwrap_or_default();
        let mut values = vec![0; len];
        for (index, value) in entries {
            values[*index as usize] = *value;
        }
        Self { values }
    }

    /// Build the table from the font-level record, if it has any entries.
    pub fn from_record(record: &FontHintRecord) -> Result<Option<Self>> {
        Ok(record
            .control_values()?
            .map(|entries| Self::from_sparse(&entries)))
    }
}

impl FontWrite for Cvt {
    fn write_into(&self, writer: &mut TableWriter) {
        self.values.write_into(writer)
    }
}

impl Validate for Cvt {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("cvt", |ctx| {
            if self.values.is_empty() {
                ctx.report("table must not be empty");
            }
        })
    }
}
