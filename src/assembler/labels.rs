//! Label resolution: `:label` definitions to instruction addresses.

use std::collections::HashMap;

use super::lexer::{LineKind, SourceLine};

/// Maps label names (without the leading `:`) to the instruction address
/// of the next `BytecodeDef` line that followed their definition.
pub type LabelTable = HashMap<String, usize>;

/// Scans `lines` for `LabelDef` records and builds the label table.
///
/// First occurrence wins on a duplicate name, the same rule used for
/// label uniqueness elsewhere in the assembler.
pub fn parse_labels(lines: &[SourceLine]) -> LabelTable {
    let mut labels = LabelTable::new();
    for line in lines {
        if line.kind != LineKind::LabelDef {
            continue;
        }
        let name = line.tokens[0].trim_start_matches(':').to_string();
        labels.entry(name).or_insert(line.address);
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::tokenize;

    #[test]
    fn label_address_is_next_bytecode_line() {
        let lines = tokenize(":start\nprinti #1\nprinti #2\n:end\nprinti #3\n");
        let labels = parse_labels(&lines);
        assert_eq!(labels["start"], 0);
        assert_eq!(labels["end"], 2);
    }

    #[test]
    fn first_occurrence_of_duplicate_label_wins() {
        let lines = tokenize(":l\nprinti #1\n:l\nprinti #2\n");
        let labels = parse_labels(&lines);
        assert_eq!(labels["l"], 0);
    }
}
