//! Dashboard state kept in the durable session tier: the selected section and
//! the service and client lists.

mod collection;

pub use collection::{Collection, Record};

use tracing::{debug, warn};

use crate::models::{ClientRecord, Section, ServiceOffering, UserProfile};
use crate::session::{SessionStore, StorageError, Tier, ACTIVE_SECTION_KEY};

pub const SERVICES_KEY: &str = "dashboardServices";
pub const CLIENTS_KEY: &str = "dashboardClients";

pub struct Dashboard {
    session: SessionStore,
    services: Collection<ServiceOffering>,
    clients: Collection<ClientRecord>,
}

impl Dashboard {
    pub fn open(session: SessionStore) -> Result<Self, StorageError> {
        let services = Collection::load(session.shared(Tier::Durable), SERVICES_KEY)?;
        let clients = Collection::load(session.shared(Tier::Durable), CLIENTS_KEY)?;
        debug!(
            services = services.len(),
            clients = clients.len(),
            "Dashboard opened"
        );
        Ok(Dashboard {
            session,
            services,
            clients,
        })
    }

    /// The logged-in user's profile, if the stored one is readable.
    pub fn profile(&self) -> Result<Option<UserProfile>, StorageError> {
        Ok(self
            .session
            .user_profile()?
            .as_ref()
            .and_then(UserProfile::from_value))
    }

    /// The last selected section. Unknown stored values fall back to the default.
    pub fn active_section(&self) -> Result<Section, StorageError> {
        let Some(raw) = self.session.durable().get_item(ACTIVE_SECTION_KEY)? else {
            return Ok(Section::default());
        };
        Ok(raw.parse().unwrap_or_else(|e| {
            warn!("Ignoring stored section: {}", e);
            Section::default()
        }))
    }

    pub fn set_active_section(&self, section: Section) -> Result<(), StorageError> {
        self.session
            .durable()
            .set_item(ACTIVE_SECTION_KEY, section.id().to_string())
    }

    pub fn services(&self) -> &Collection<ServiceOffering> {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Collection<ServiceOffering> {
        &mut self.services
    }

    pub fn clients(&self) -> &Collection<ClientRecord> {
        &self.clients
    }

    pub fn clients_mut(&mut self) -> &mut Collection<ClientRecord> {
        &mut self.clients
    }
}
