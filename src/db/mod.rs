use std::time::Duration;

use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, ClientSession, Collection,
};

use crate::{config::Config, errors::AppResult};

const POOL_SIZE: (u32, u32) = (2, 10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the service database. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let options = client_options(config).await?;
        let database = Self {
            client: Client::with_options(options)?,
            name: config.mongo_db_name.clone(),
        };

        database.ping().await?;
        log::info!("Connected to MongoDB database '{}'", database.name);

        Ok(database)
    }

    pub fn get_collection<T>(&self, collection_name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client.database(&self.name).collection(collection_name)
    }

    /// Starts a session for a multi-document transaction. Transactions need a
    /// replica set or sharded cluster.
    pub async fn start_session(&self) -> AppResult<ClientSession> {
        Ok(self.client.start_session().await?)
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.ping().await
    }

    async fn ping(&self) -> AppResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

async fn client_options(config: &Config) -> AppResult<ClientOptions> {
    let mut options = ClientOptions::parse(&config.mongo_conn_string).await?;

    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    options.min_pool_size = Some(POOL_SIZE.0);
    options.max_pool_size = Some(POOL_SIZE.1);
    options.connect_timeout = Some(CONNECT_TIMEOUT);
    options.server_selection_timeout = Some(CONNECT_TIMEOUT);
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Database>();
    }

    #[tokio::test]
    async fn test_client_options_apply_pool_and_timeouts() {
        let options = client_options(&Config::test_config()).await.unwrap();

        assert_eq!(options.min_pool_size, Some(2));
        assert_eq!(options.max_pool_size, Some(10));
        assert_eq!(options.connect_timeout, Some(CONNECT_TIMEOUT));
        assert_eq!(options.app_name.as_deref(), Some("learnplatform-server"));
        assert!(options.server_api.is_some());
    }
}
