//! Structural node shared by every entity.
//!
//! A [`Node`] is one group of the container plus its `what`, `where` and
//! `how` metadata groups. Entities embed a node by value and build their
//! own attributes on top of it.

use time::OffsetDateTime;
use tracing::trace;

use super::attribute::{get_att, get_att_opt, get_time, new_att, new_time, set_att, set_time, Attribute};
use super::constants::*;
use crate::core::{Attributes, Container};
use crate::util::{Error, Result};

/// A group and its metadata groups.
///
/// `what` is created with the node. `where` and `how` are created on the
/// first write that needs them. In open mode every metadata group is
/// optional and only reported missing when something is read from it.
#[derive(Debug)]
pub struct Node<G: Container> {
    this: G,
    what: Option<G>,
    where_: Option<G>,
    how: Option<G>,
    how_attr_count: usize,
}

impl<G: Container> Node<G> {
    fn with_what(this: G) -> Result<Self> {
        let what = this.create_group(GRP_WHAT)?;
        Ok(Self { this, what: Some(what), where_: None, how: None, how_attr_count: 0 })
    }

    fn from_existing(this: G) -> Result<Self> {
        let open_opt = |name: &str| -> Result<Option<G>> {
            if this.child_exists(name)? {
                this.open_group(name).map(Some)
            } else {
                Ok(None)
            }
        };
        let what = open_opt(GRP_WHAT)?;
        let where_ = open_opt(GRP_WHERE)?;
        let how = open_opt(GRP_HOW)?;
        let how_attr_count = match &how {
            Some(h) => h.attr_count()?,
            None => 0,
        };
        trace!(path = this.path(), how_attr_count, "opened node");
        Ok(Self { this, what, where_, how, how_attr_count })
    }

    /// Create the child group `name` under `parent`.
    pub fn create(parent: &G, name: &str) -> Result<Self> {
        Self::with_what(parent.create_group(name)?)
    }

    /// Create the child group `<name><index>` under `parent`.
    pub fn create_indexed(parent: &G, name: &str, index: usize) -> Result<Self> {
        Self::create(parent, &format!("{name}{index}"))
    }

    /// Open the child group `name` under `parent`.
    pub fn open(parent: &G, name: &str) -> Result<Self> {
        Self::from_existing(parent.open_group(name)?)
    }

    /// Open the child group `<name><index>` under `parent`.
    pub fn open_indexed(parent: &G, name: &str, index: usize) -> Result<Self> {
        Self::open(parent, &format!("{name}{index}"))
    }

    /// Initialise a file root: convention, object type and validity time.
    pub fn create_root(root: G, object: ObjectType, valid_time: OffsetDateTime) -> Result<Self> {
        new_att(&root, ATN_CONVENTIONS, &VAL_CONVENTIONS.to_string())?;
        let node = Self::with_what(root)?;
        let what = node.what()?;
        new_att(what, ATN_OBJECT, &object)?;
        new_att(what, ATN_VERSION, &VAL_VERSION.to_string())?;
        new_time(what, ATN_DATE, ATN_TIME, valid_time)?;
        Ok(node)
    }

    /// Open a file root and check that it holds `object`.
    pub fn open_root(root: G, object: ObjectType) -> Result<Self> {
        let node = Self::from_existing(root)?;
        let stored: String = get_att(node.what()?, ATN_OBJECT)?;
        if stored != object.as_str() {
            return Err(Error::ProductMismatch {
                path: node.this.path().to_string(),
                expected: object.as_str().to_string(),
                actual: stored,
            });
        }
        Ok(node)
    }

    /// Check that `what/product` holds `product`.
    pub fn check_product(&self, product: ProductType) -> Result<()> {
        let stored: String = get_att(self.what()?, ATN_PRODUCT)?;
        if stored != product.as_str() {
            return Err(Error::ProductMismatch {
                path: self.this.path().to_string(),
                expected: product.as_str().to_string(),
                actual: stored,
            });
        }
        Ok(())
    }

    /// The group this node stands for.
    pub fn group(&self) -> &G {
        &self.this
    }

    pub fn path(&self) -> &str {
        self.this.path()
    }

    fn missing(&self, name: &str) -> Error {
        Error::open_failure(self.this.path(), name)
    }

    /// The `what` group. Fails if it does not exist.
    pub fn what(&self) -> Result<&G> {
        self.what.as_ref().ok_or_else(|| self.missing(GRP_WHAT))
    }

    /// The `where` group. Fails if it does not exist.
    pub fn where_(&self) -> Result<&G> {
        self.where_.as_ref().ok_or_else(|| self.missing(GRP_WHERE))
    }

    /// The `how` group, if present.
    pub fn how(&self) -> Option<&G> {
        self.how.as_ref()
    }

    /// The `what` group, created if absent.
    pub fn what_mut(&mut self) -> Result<&G> {
        ensure(&self.this, &mut self.what, GRP_WHAT)
    }

    /// The `where` group, created if absent.
    pub fn where_mut(&mut self) -> Result<&G> {
        ensure(&self.this, &mut self.where_, GRP_WHERE)
    }

    /// The `how` group, created if absent.
    pub fn how_mut(&mut self) -> Result<&G> {
        ensure(&self.this, &mut self.how, GRP_HOW)
    }

    /// Read an optional `how` attribute. A missing group or attribute is `None`.
    pub fn how_attr<T: Attribute>(&self, name: &str) -> Result<Option<T>> {
        match &self.how {
            Some(how) => get_att_opt(how, name),
            None => Ok(None),
        }
    }

    /// Create or replace a `how` attribute.
    pub fn set_how_attr<T: Attribute>(&mut self, name: &str, value: &T) -> Result<()> {
        set_att(self.how_mut()?, name, value)
    }

    /// Number of `how` attributes found when the node was opened.
    pub fn how_attr_count(&self) -> usize {
        self.how_attr_count
    }

    // ------------------------------------------------------------------------
    // File-level metadata
    // ------------------------------------------------------------------------

    /// Nominal validity time (`what/date` + `what/time`).
    pub fn valid_time(&self) -> Result<OffsetDateTime> {
        get_time(self.what()?, ATN_DATE, ATN_TIME)
    }

    pub fn set_valid_time(&mut self, t: OffsetDateTime) -> Result<()> {
        set_time(self.what_mut()?, ATN_DATE, ATN_TIME, t)
    }

    /// Source identifier (`what/source`).
    pub fn source(&self) -> Result<String> {
        get_att(self.what()?, ATN_SOURCE)
    }

    pub fn set_source(&mut self, source: &str) -> Result<()> {
        set_att(self.what_mut()?, ATN_SOURCE, &source.to_string())
    }

    /// Number of contiguous `dataset<N>` children.
    ///
    /// Probes downward from the child count and returns the highest
    /// index that exists.
    pub fn dataset_count(&self) -> Result<usize> {
        let mut n = self.this.child_count()?;
        while n > 0 {
            if self.this.child_exists(&format!("{GRP_DATASET}{n}"))? {
                break;
            }
            n -= 1;
        }
        Ok(n)
    }
}

fn ensure<'a, G: Container>(this: &G, slot: &'a mut Option<G>, name: &str) -> Result<&'a G> {
    let group = match slot.take() {
        Some(group) => group,
        None => this.create_group(name)?,
    };
    Ok(slot.insert(group))
}

/// Convert a stored count to `usize`.
pub(crate) fn get_count(node: &impl Attributes, name: &str) -> Result<usize> {
    let v: i64 = get_att(node, name)?;
    usize::try_from(v).map_err(|_| Error::bad_value(node.path(), name, v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{File, Group};
    use time::macros::datetime;

    #[test]
    fn test_create_and_open() -> Result<()> {
        let file = File::in_memory();
        let root = file.root();

        let mut node = Node::create_indexed(&root, GRP_DATASET, 1)?;
        assert_eq!(node.path(), "/dataset1");
        assert!(node.what().is_ok());
        assert!(matches!(node.where_(), Err(Error::OpenFailure { .. })));
        assert!(node.how().is_none());

        node.where_mut()?;
        node.set_how_attr(how::TASK, &"vol_a".to_string())?;
        node.set_how_attr(how::RPM, &2.0f64)?;

        let opened: Node<Group> = Node::open_indexed(&root, GRP_DATASET, 1)?;
        assert!(opened.where_().is_ok());
        assert_eq!(opened.how_attr_count(), 2);
        assert_eq!(opened.how_attr::<f64>(how::RPM)?, Some(2.0));
        assert_eq!(opened.how_attr::<f64>(how::BEAMWIDTH)?, None);

        assert!(matches!(
            Node::open_indexed(&root, GRP_DATASET, 2),
            Err(Error::OpenFailure { .. })
        ));
        assert!(matches!(
            Node::create_indexed(&root, GRP_DATASET, 1),
            Err(Error::AlreadyExists { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_how_reads_none() -> Result<()> {
        let file = File::in_memory();
        Node::create(&file.root(), "dataset1")?;
        let node = Node::open(&file.root(), "dataset1")?;
        assert_eq!(node.how_attr_count(), 0);
        assert_eq!(node.how_attr::<String>(how::SOFTWARE)?, None);
        Ok(())
    }

    #[test]
    fn test_root_object_check() -> Result<()> {
        let file = File::in_memory();
        let t = datetime!(2012-01-01 00:00 UTC);
        Node::create_root(file.root(), ObjectType::VolumePolar, t)?;

        let root = Node::open_root(file.root(), ObjectType::VolumePolar)?;
        assert_eq!(root.valid_time()?, t);
        assert_eq!(get_att::<String>(root.group(), ATN_CONVENTIONS)?, VAL_CONVENTIONS);

        assert!(matches!(
            Node::open_root(file.root(), ObjectType::VerticalProfile),
            Err(Error::ProductMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_dataset_count() -> Result<()> {
        let file = File::in_memory();
        let root = file.root();
        let node = Node::create_root(root.clone(), ObjectType::VolumePolar, datetime!(2012-01-01 00:00 UTC))?;
        assert_eq!(node.dataset_count()?, 0);
        for i in 1..=3 {
            Node::create_indexed(&root, GRP_DATASET, i)?;
        }
        assert_eq!(node.dataset_count()?, 3);
        Ok(())
    }
}
