use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identity_claims")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub identity_resource_id: i32,
    pub claim_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity_resource::Entity",
        from = "Column::IdentityResourceId",
        to = "super::identity_resource::Column::Id",
        on_delete = "Cascade"
    )]
    IdentityResource,
}

impl Related<super::identity_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IdentityResource.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
