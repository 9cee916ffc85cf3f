use std::collections::BTreeMap;

use derive_more::{Deref, DerefMut};

use crate::content::{Page, PagePath};

/// The pages of a site, ordered by path.
#[derive(Debug, Default, Deref, DerefMut)]
pub struct Pages(BTreeMap<PagePath, Page>);

impl Pages {
    /// Adds the given [`Page`], replacing any page with the same path.
    pub fn add(&mut self, page: Page) {
        self.0.insert(page.path.clone(), page);
    }
}

impl FromIterator<Page> for Pages {
    fn from_iter<T: IntoIterator<Item = Page>>(iter: T) -> Self {
        let mut pages = Self::default();
        for page in iter {
            pages.add(page);
        }
        pages
    }
}
