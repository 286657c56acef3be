//! Backpatch bookkeeping for headers whose length is unknown when opened.
//!
//! The writer appends value bytes to a content buffer but leaves container
//! and annotation-wrapper headers out. Each missing header is a [`Patch`]
//! recorded at the buffer offset it belongs to, kept in stream order. When
//! the buffered values are serialized the headers are spliced back in.

use crate::constants::Type;
use crate::type_descriptor::{encode_header, header_len, EncodedHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatchKind {
    /// Header of a list, sexp or struct.
    Container(u8),
    /// Header of an annotation wrapper around a container.
    Wrapper,
    /// A local symbol table declaration, rendered only at serialization.
    /// Covers local symbols from `first_local` up to the next declaration.
    SymbolTable { first_local: usize, append: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Patch {
    pub kind: PatchKind,
    /// Offset in the content buffer where the header is spliced in.
    pub offset: usize,
    /// Content length, header excluded.
    pub length: usize,
}

impl Patch {
    /// Header bytes plus content length.
    pub fn encoded_len(&self) -> usize {
        match self.kind {
            PatchKind::Container(type_code) => header_len(type_code, self.length) + self.length,
            PatchKind::Wrapper => header_len(Type::ANNOTATION, self.length) + self.length,
            PatchKind::SymbolTable { .. } => self.length,
        }
    }

    pub fn header(&self) -> Option<EncodedHeader> {
        match self.kind {
            PatchKind::Container(type_code) => Some(encode_header(type_code, self.length)),
            PatchKind::Wrapper => Some(encode_header(Type::ANNOTATION, self.length)),
            PatchKind::SymbolTable { .. } => None,
        }
    }
}

/// An open container on the writer's stack.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenContainer {
    pub type_code: u8,
    /// Index of the container's patch.
    pub patch: usize,
    /// Index of the wrapper patch when the container is annotated.
    pub wrapper: Option<usize>,
}

/// Patches of all buffered values, in stream order.
#[derive(Debug, Default)]
pub(crate) struct PatchList {
    patches: Vec<Patch>,
    stack: Vec<OpenContainer>,
    /// Patch index and buffer offset where the open top-level value starts.
    top_level_start: Option<(usize, usize)>,
}

impl PatchList {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn innermost(&self) -> Option<&OpenContainer> {
        self.stack.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Patch> {
        self.patches.get_mut(index)
    }

    pub fn clear(&mut self) {
        self.patches.clear();
        self.stack.clear();
        self.top_level_start = None;
    }

    /// Adds `n` bytes to the innermost open container only. Ancestors
    /// receive the total when the container closes.
    pub fn patch(&mut self, n: usize) {
        if let Some(open) = self.stack.last() {
            self.patches[open.patch].length += n;
        }
    }

    /// Starts an annotation wrapper at `offset`; returns its index.
    pub fn open_wrapper(&mut self, offset: usize) -> usize {
        self.mark_top_level_start(offset);
        self.patches.push(Patch {
            kind: PatchKind::Wrapper,
            offset,
            length: 0,
        });
        self.patches.len() - 1
    }

    pub fn open_container(&mut self, type_code: u8, offset: usize, wrapper: Option<usize>) {
        self.mark_top_level_start(offset);
        self.patches.push(Patch {
            kind: PatchKind::Container(type_code),
            offset,
            length: 0,
        });
        self.stack.push(OpenContainer {
            type_code,
            patch: self.patches.len() - 1,
            wrapper,
        });
    }

    fn mark_top_level_start(&mut self, offset: usize) {
        if self.stack.is_empty() && self.top_level_start.is_none() {
            self.top_level_start = Some((self.patches.len(), offset));
        }
    }

    /// Closes the innermost container (and its wrapper) and folds the
    /// encoded size into the parent. Returns the closed container.
    pub fn close_container(&mut self) -> Option<OpenContainer> {
        let open = self.stack.pop()?;
        let mut total = self.patches[open.patch].encoded_len();
        if let Some(wrapper) = open.wrapper {
            self.patches[wrapper].length += total;
            total = self.patches[wrapper].encoded_len();
        }
        self.patch(total);
        if self.stack.is_empty() {
            self.top_level_start = None;
        }
        Some(open)
    }

    /// Records a symbol table declaration ahead of the open top-level value,
    /// or at `offset` when no value is open.
    pub fn insert_symbol_table(&mut self, offset: usize, first_local: usize, append: bool) {
        let patch = Patch {
            kind: PatchKind::SymbolTable { first_local, append },
            offset,
            length: 0,
        };
        match self.top_level_start {
            Some((index, start)) => {
                self.patches.insert(index, Patch { offset: start, ..patch });
                for open in &mut self.stack {
                    open.patch += 1;
                    if let Some(wrapper) = &mut open.wrapper {
                        *wrapper += 1;
                    }
                }
                self.top_level_start = Some((index + 1, start));
            }
            None => self.patches.push(patch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_folds_into_parent() {
        let mut patches = PatchList::default();
        patches.open_container(Type::LIST, 0, None);
        patches.patch(2);
        patches.open_container(Type::LIST, 2, None);
        patches.patch(14);
        patches.close_container();
        // 14 bytes need a VarUInt length: 2 header bytes.
        assert_eq!(patches.iter().nth(1).map(|p| p.encoded_len()), Some(16));
        patches.close_container();
        assert_eq!(patches.iter().next().map(|p| p.length), Some(18));
        assert_eq!(patches.depth(), 0);
    }

    #[test]
    fn wrapper_receives_container_total() {
        let mut patches = PatchList::default();
        let wrapper = patches.open_wrapper(0);
        patches.get_mut(wrapper).unwrap().length += 2;
        patches.open_container(Type::STRUCT, 2, Some(wrapper));
        patches.close_container();
        let lengths: Vec<usize> = patches.iter().map(|p| p.length).collect();
        assert_eq!(lengths, vec![3, 0]);
    }

    #[test]
    fn symbol_table_goes_before_open_top_level_value() {
        let mut patches = PatchList::default();
        patches.open_container(Type::LIST, 5, None);
        patches.open_container(Type::SEXP, 5, None);
        patches.insert_symbol_table(9, 0, false);
        let kinds: Vec<PatchKind> = patches.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PatchKind::SymbolTable { first_local: 0, append: false },
                PatchKind::Container(Type::LIST),
                PatchKind::Container(Type::SEXP),
            ]
        );
        assert_eq!(patches.iter().next().map(|p| p.offset), Some(5));
        assert_eq!(patches.innermost().map(|o| o.patch), Some(2));
        patches.patch(1);
        patches.close_container();
        patches.close_container();
        assert_eq!(patches.iter().nth(1).map(|p| p.length), Some(2));
    }
}
