use neo4rs::query;
use uuid::Uuid;

use wayfare_common::{TRUST_BOOST_PER_VISIT, TRUST_BOOST_VISIT_CAP};

use crate::GraphClient;

/// Read-only traversal over the trust graph. Used by the discovery pipeline.
pub struct TrustReader {
    client: GraphClient,
}

impl TrustReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Count distinct followees of `user_id` with a recorded visit to the POI.
    pub async fn followee_visits(
        &self,
        user_id: Uuid,
        poi_id: Uuid,
    ) -> Result<u32, neo4rs::Error> {
        let q = query(
            "MATCH (u:User {id: $user_id})-[:FOLLOWS]->(f:User)-[:VISITED]->(p:Poi {id: $poi_id})
             RETURN count(DISTINCT f) AS visits",
        )
        .param("user_id", user_id.to_string())
        .param("poi_id", poi_id.to_string());

        let mut stream = self.client.graph.execute(q).await?;
        let visits = match stream.next().await? {
            Some(row) => row.get::<i64>("visits").unwrap_or(0),
            None => 0,
        };

        Ok(u32::try_from(visits).unwrap_or(0))
    }

    /// Trust boost for (user, POI): 1.0 when nobody the user follows has
    /// been there, up to 1.2 at the visit cap.
    pub async fn boost(&self, user_id: Uuid, poi_id: Uuid) -> Result<f64, neo4rs::Error> {
        let visits = self.followee_visits(user_id, poi_id).await?;
        Ok(boost_for_visits(visits))
    }
}

/// `1 + min(visits, cap) * 0.04`, so the multiplier stays in [1.0, 1.2].
pub fn boost_for_visits(visits: u32) -> f64 {
    1.0 + f64::from(visits.min(TRUST_BOOST_VISIT_CAP)) * TRUST_BOOST_PER_VISIT
}
