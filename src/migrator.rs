use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_items_table::Migration),
            Box::new(m20240101_000003_create_sales_table::Migration),
            Box::new(m20240101_000004_create_sale_lines_table::Migration),
            Box::new(m20240101_000005_create_payment_dues_table::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Username).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_username")
                        .table(Users::Table)
                        .col(Users::Username)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        Email,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::Sku).string().not_null())
                        .col(ColumnDef::new(Items::Price).decimal().not_null().default(0))
                        .col(ColumnDef::new(Items::Cost).decimal().not_null().default(0))
                        .col(ColumnDef::new(Items::Stock).decimal().not_null().default(0))
                        .col(
                            ColumnDef::new(Items::MinStockLevel)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Items::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_sku")
                        .table(Items::Table)
                        .col(Items::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
        Name,
        Sku,
        Price,
        Cost,
        Stock,
        MinStockLevel,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_sales_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_sales_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Sales::Date)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sales::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sales::Tax).decimal().not_null().default(0))
                        .col(ColumnDef::new(Sales::Total).decimal().not_null().default(0))
                        .col(ColumnDef::new(Sales::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Sales::Status).string().not_null())
                        .col(ColumnDef::new(Sales::CustomerName).string().null())
                        .col(ColumnDef::new(Sales::CashierId).uuid().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_cashier")
                                .from(Sales::Table, Sales::CashierId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_date")
                        .table(Sales::Table)
                        .col(Sales::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_status")
                        .table(Sales::Table)
                        .col(Sales::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        Date,
        Subtotal,
        Tax,
        Total,
        PaymentMethod,
        Status,
        CustomerName,
        CashierId,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
    }
}

mod m20240101_000004_create_sale_lines_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_sale_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SaleLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SaleLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SaleLines::SaleId).uuid().not_null())
                        .col(ColumnDef::new(SaleLines::ItemId).uuid().not_null())
                        .col(ColumnDef::new(SaleLines::Quantity).decimal().not_null())
                        .col(ColumnDef::new(SaleLines::Price).decimal().not_null())
                        .col(ColumnDef::new(SaleLines::Total).decimal().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_lines_sale")
                                .from(SaleLines::Table, SaleLines::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_lines_item")
                                .from(SaleLines::Table, SaleLines::ItemId)
                                .to(Items::Table, Items::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_lines_sale_id")
                        .table(SaleLines::Table)
                        .col(SaleLines::SaleId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SaleLines {
        Table,
        Id,
        SaleId,
        ItemId,
        Quantity,
        Price,
        Total,
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
    }
}

mod m20240101_000005_create_payment_dues_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_payment_dues_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentDues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentDues::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentDues::SaleId).uuid().not_null())
                        .col(ColumnDef::new(PaymentDues::Amount).decimal().not_null())
                        .col(
                            ColumnDef::new(PaymentDues::DueDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentDues::Status).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_dues_sale")
                                .from(PaymentDues::Table, PaymentDues::SaleId)
                                .to(Sales::Table, Sales::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_dues_sale_id")
                        .table(PaymentDues::Table)
                        .col(PaymentDues::SaleId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_dues_status_due_date")
                        .table(PaymentDues::Table)
                        .col(PaymentDues::Status)
                        .col(PaymentDues::DueDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentDues::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentDues {
        Table,
        Id,
        SaleId,
        Amount,
        DueDate,
        Status,
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
    }
}
