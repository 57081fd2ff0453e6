//! Page objects
//!
//! Pages are built from a [`PageFactory`] so that one page can hand out the
//! next one during navigation:
//!
//! ```ignore
//! struct HomePage { pages: PageFactory }
//!
//! impl PageObject for HomePage {
//!     fn from_factory(pages: &PageFactory) -> Self {
//!         Self { pages: pages.clone() }
//!     }
//! }
//!
//! let cart = pages.get::<HomePage>().open_cart().await?;
//! ```

use async_trait::async_trait;

use super::dsl::Ui;
use super::UiError;

pub trait PageObject: Sized + Send + Sync {
    fn from_factory(pages: &PageFactory) -> Self;
}

/// A page that can check it is currently displayed
#[async_trait]
pub trait VisiblePage: PageObject {
    async fn verify_visible(&self) -> Result<&Self, UiError>;
}

/// Hands out page objects sharing one [`Ui`]
#[derive(Clone, Debug)]
pub struct PageFactory {
    ui: Ui,
}

impl PageFactory {
    pub fn new(ui: Ui) -> Self {
        Self { ui }
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    pub fn get<P: PageObject>(&self) -> P {
        P::from_factory(self)
    }
}
