use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::aggregate;
use crate::calc;
use crate::config::Config;
use crate::db::SessionStore;
use crate::export::ExportControl;
use crate::form::FormState;
use crate::remote::{HttpReviewServer, ReviewServer};
use crate::schema::ReviewNumber;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One open review page: its form and its PDF trigger.
pub struct PageState {
    pub form: FormState,
    pub control: ExportControl,
}

impl PageState {
    /// A page as it looks right after navigation: pages 1-4 restore their
    /// own saved record and run the totals pass, page 5 aggregates the four
    /// earlier records.
    pub fn load(store: &SessionStore, review: ReviewNumber) -> Self {
        let mut form = FormState::new(review);
        if review.is_final() {
            let records = ReviewNumber::carried().map(|r| store.load_raw(&r.session_key()));
            let carried = aggregate::collect(&records);
            aggregate::populate_final_page(&mut form, &carried);
        } else {
            store.load(&review.session_key(), &mut form);
            calc::recalculate_totals(&mut form);
        }
        Self {
            form,
            control: ExportControl::for_review(review),
        }
    }
}

pub struct AppState {
    pub session_id: Uuid,
    pub config: Config,
    pub store: SessionStore,
    pub server: Box<dyn ReviewServer>,
    pub pages: BTreeMap<ReviewNumber, PageState>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let server = HttpReviewServer::new(&config.server_url, config.http_timeout)?;
        Ok(Self {
            session_id: Uuid::new_v4(),
            store: SessionStore::open_in_memory()?,
            server: Box::new(server),
            pages: BTreeMap::new(),
            config,
        })
    }
}

/// Returns the open page, loading it first if it was never opened.
pub fn ensure_page<'a>(
    pages: &'a mut BTreeMap<ReviewNumber, PageState>,
    store: &SessionStore,
    review: ReviewNumber,
) -> &'a mut PageState {
    pages
        .entry(review)
        .or_insert_with(|| PageState::load(store, review))
}

/// Reloads the page from the session store, discarding unsaved edits.
pub fn open_page<'a>(
    pages: &'a mut BTreeMap<ReviewNumber, PageState>,
    store: &SessionStore,
    review: ReviewNumber,
) -> &'a mut PageState {
    let page = PageState::load(store, review);
    match pages.entry(review) {
        Entry::Occupied(mut e) => {
            e.insert(page);
            e.into_mut()
        }
        Entry::Vacant(e) => e.insert(page),
    }
}
