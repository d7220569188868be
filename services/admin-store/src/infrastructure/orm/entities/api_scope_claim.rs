use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_scope_claims")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub api_scope_id: i32,
    pub claim_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::api_scope::Entity",
        from = "Column::ApiScopeId",
        to = "super::api_scope::Column::Id",
        on_delete = "Cascade"
    )]
    ApiScope,
}

impl Related<super::api_scope::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiScope.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
