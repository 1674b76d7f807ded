// sea-orm's MigrationTrait is defined via `#[async_trait]` with an elided
// SchemaManager lifetime; the macro makes the idiomatic `&SchemaManager`
// signature the only one that matches (an explicit `<'_>` becomes early-bound
// and fails E0195). Scope an allow so the crate-wide deny(rust_2018_idioms)
// doesn't reject the generated migrations.
#![allow(elided_lifetimes_in_paths)]

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog_tables::Migration),
            Box::new(m20250101_000002_create_cart_tables::Migration),
            Box::new(m20250101_000003_create_discount_tables::Migration),
            Box::new(m20250101_000004_create_address_table::Migration),
            Box::new(m20250101_000005_create_shipping_tables::Migration),
            Box::new(m20250101_000006_create_checkout_sessions_table::Migration),
            Box::new(m20250101_000007_create_order_tables::Migration),
            Box::new(m20250101_000008_create_email_and_lead_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(
                            ColumnDef::new(Products::BasePrice)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::StripePriceId).string().not_null())
                        .col(ColumnDef::new(Products::WeightGrams).integer().not_null())
                        .col(ColumnDef::new(Products::UnitsPerBox).integer().not_null())
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::SoldOut)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Flavours::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Flavours::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Flavours::Name).string().not_null())
                        .col(
                            ColumnDef::new(Flavours::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Flavours::Description).text().not_null())
                        .col(ColumnDef::new(Flavours::MiniDescription).string().not_null())
                        .col(
                            ColumnDef::new(Flavours::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Flavours::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Flavours::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Allergens::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Allergens::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Allergens::Name).string().not_null())
                        .col(
                            ColumnDef::new(Allergens::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Allergens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Allergens::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Allergens::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Flavours::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum Products {
        Table,
        Id,
        Name,
        Slug,
        Description,
        BasePrice,
        StripePriceId,
        WeightGrams,
        UnitsPerBox,
        Active,
        SoldOut,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum Flavours {
        Table,
        Id,
        Name,
        Slug,
        Description,
        MiniDescription,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum Allergens {
        Table,
        Id,
        Name,
        Slug,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_cart_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::UserId).uuid().null())
                        .col(ColumnDef::new(Carts::SessionId).string().null())
                        .col(ColumnDef::new(Carts::DiscountId).uuid().null())
                        .col(ColumnDef::new(Carts::GiftMessage).text().null())
                        .col(ColumnDef::new(Carts::ShippingDate).date().null())
                        .col(
                            ColumnDef::new(Carts::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Carts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_carts_session_id")
                        .table(Carts::Table)
                        .col(Carts::SessionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_carts_user_id")
                        .table(Carts::Table)
                        .col(Carts::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CartItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_cart_id")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BoxCustomizations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BoxCustomizations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BoxCustomizations::CartItemId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(BoxCustomizations::SelectionType)
                                .string_len(20)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_box_customizations_cart_item")
                                .from(BoxCustomizations::Table, BoxCustomizations::CartItemId)
                                .to(CartItems::Table, CartItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BoxFlavorSelections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BoxFlavorSelections::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BoxFlavorSelections::BoxCustomizationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BoxFlavorSelections::FlavourId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BoxFlavorSelections::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_box_flavor_selections_customization")
                                .from(
                                    BoxFlavorSelections::Table,
                                    BoxFlavorSelections::BoxCustomizationId,
                                )
                                .to(BoxCustomizations::Table, BoxCustomizations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BoxCustomizationAllergens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BoxCustomizationAllergens::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BoxCustomizationAllergens::BoxCustomizationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BoxCustomizationAllergens::AllergenId)
                                .uuid()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_box_customization_allergens_customization")
                                .from(
                                    BoxCustomizationAllergens::Table,
                                    BoxCustomizationAllergens::BoxCustomizationId,
                                )
                                .to(BoxCustomizations::Table, BoxCustomizations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(BoxCustomizationAllergens::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(BoxFlavorSelections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BoxCustomizations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum Carts {
        Table,
        Id,
        UserId,
        SessionId,
        DiscountId,
        GiftMessage,
        ShippingDate,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum BoxCustomizations {
        #[iden = "cart_item_box_customizations"]
        Table,
        Id,
        CartItemId,
        SelectionType,
    }

    #[derive(Iden)]
    pub enum BoxFlavorSelections {
        #[iden = "cart_item_box_flavor_selections"]
        Table,
        Id,
        BoxCustomizationId,
        FlavourId,
        Quantity,
    }

    #[derive(Iden)]
    pub enum BoxCustomizationAllergens {
        #[iden = "cart_item_box_customization_allergens"]
        Table,
        Id,
        BoxCustomizationId,
        AllergenId,
    }
}

mod m20250101_000003_create_discount_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_discount_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Discounts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Discounts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Discounts::Title).string().not_null())
                        .col(
                            ColumnDef::new(Discounts::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Discounts::StripeId).string().not_null())
                        .col(
                            ColumnDef::new(Discounts::DiscountType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::Amount)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::MinOrderValue)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Discounts::StartDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::EndDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Discounts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DiscountExclusions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiscountExclusions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiscountExclusions::DiscountId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiscountExclusions::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_discount_exclusions_discount")
                                .from(DiscountExclusions::Table, DiscountExclusions::DiscountId)
                                .to(Discounts::Table, Discounts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_discount_exclusions_discount_id")
                        .table(DiscountExclusions::Table)
                        .col(DiscountExclusions::DiscountId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DiscountExclusions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Discounts::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum Discounts {
        Table,
        Id,
        Title,
        Code,
        StripeId,
        DiscountType,
        Amount,
        MinOrderValue,
        StartDate,
        EndDate,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum DiscountExclusions {
        Table,
        Id,
        DiscountId,
        ProductId,
    }
}

mod m20250101_000004_create_address_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_address_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Addresses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Addresses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Addresses::UserId).uuid().null())
                        .col(ColumnDef::new(Addresses::SessionId).string().null())
                        .col(
                            ColumnDef::new(Addresses::AddressType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Addresses::FirstName).string().not_null())
                        .col(ColumnDef::new(Addresses::LastName).string().not_null())
                        .col(ColumnDef::new(Addresses::Phone).string().not_null())
                        .col(ColumnDef::new(Addresses::StreetAddress).string().not_null())
                        .col(ColumnDef::new(Addresses::StreetAddress2).string().null())
                        .col(ColumnDef::new(Addresses::City).string().not_null())
                        .col(ColumnDef::new(Addresses::County).string().null())
                        .col(ColumnDef::new(Addresses::Postcode).string().not_null())
                        .col(ColumnDef::new(Addresses::Country).string().not_null())
                        .col(
                            ColumnDef::new(Addresses::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Addresses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Addresses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_addresses_session_id")
                        .table(Addresses::Table)
                        .col(Addresses::SessionId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Addresses::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum Addresses {
        Table,
        Id,
        UserId,
        SessionId,
        AddressType,
        FirstName,
        LastName,
        Phone,
        StreetAddress,
        StreetAddress2,
        City,
        County,
        Postcode,
        Country,
        IsDefault,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000005_create_shipping_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_shipping_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShippingCompanies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingCompanies::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShippingCompanies::Name).string().not_null())
                        .col(
                            ColumnDef::new(ShippingCompanies::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ShippingCompanies::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(ShippingCompanies::TrackingUrl).string().null())
                        .col(
                            ColumnDef::new(ShippingCompanies::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingCompanies::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShippingOptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingOptions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShippingOptions::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(ShippingOptions::Name).string().not_null())
                        .col(
                            ColumnDef::new(ShippingOptions::DeliverySpeed)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::Price)
                                .decimal_len(6, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::PriceMinorUnits)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::EstimatedDaysMin)
                                .small_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::EstimatedDaysMax)
                                .small_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::ServiceCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(ShippingOptions::Description).text().not_null())
                        .col(
                            ColumnDef::new(ShippingOptions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingOptions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipping_options_company")
                                .from(ShippingOptions::Table, ShippingOptions::CompanyId)
                                .to(ShippingCompanies::Table, ShippingCompanies::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShippingOptions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShippingCompanies::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum ShippingCompanies {
        Table,
        Id,
        Name,
        Code,
        Active,
        TrackingUrl,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum ShippingOptions {
        Table,
        Id,
        CompanyId,
        Name,
        DeliverySpeed,
        Price,
        PriceMinorUnits,
        EstimatedDaysMin,
        EstimatedDaysMax,
        ServiceCode,
        Active,
        Description,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000006_create_checkout_sessions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_checkout_sessions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CheckoutSessions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CheckoutSessions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutSessions::CartId).uuid().not_null())
                        .col(
                            ColumnDef::new(CheckoutSessions::ShippingAddressId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutSessions::BillingAddressId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(CheckoutSessions::Email).string().null())
                        .col(ColumnDef::new(CheckoutSessions::Phone).string().null())
                        .col(
                            ColumnDef::new(CheckoutSessions::PaymentStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutSessions::StripeSessionId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutSessions::StripePaymentIntent)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutSessions::ShippingOptionId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutSessions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutSessions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_checkout_sessions_cart")
                                .from(CheckoutSessions::Table, CheckoutSessions::CartId)
                                .to(Carts::Table, Carts::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_checkout_sessions_cart_id")
                        .table(CheckoutSessions::Table)
                        .col(CheckoutSessions::CartId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CheckoutSessions::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum CheckoutSessions {
        Table,
        Id,
        CartId,
        ShippingAddressId,
        BillingAddressId,
        Email,
        Phone,
        PaymentStatus,
        StripeSessionId,
        StripePaymentIntent,
        ShippingOptionId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum Carts {
        Table,
        Id,
    }
}

mod m20250101_000007_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Orders::CheckoutSessionId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Orders::ShippedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_checkout_session")
                                .from(Orders::Table, Orders::CheckoutSessionId)
                                .to(CheckoutSessions::Table, CheckoutSessions::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatusHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::Notes).text().null())
                        .col(ColumnDef::new(OrderStatusHistory::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_status_history_order")
                                .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_status_history_order_id")
                        .table(OrderStatusHistory::Table)
                        .col(OrderStatusHistory::OrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum Orders {
        Table,
        Id,
        OrderId,
        CheckoutSessionId,
        Status,
        ShippedAt,
        DeliveredAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum OrderStatusHistory {
        Table,
        Id,
        OrderId,
        Status,
        Notes,
        CreatedBy,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum CheckoutSessions {
        Table,
        Id,
    }
}

mod m20250101_000008_create_email_and_lead_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000008_create_email_and_lead_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(EmailRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EmailRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EmailRecords::EmailType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EmailRecords::TargetKind)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmailRecords::TargetId).uuid().not_null())
                        .col(
                            ColumnDef::new(EmailRecords::Status)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmailRecords::ErrorMessage).text().null())
                        .col(
                            ColumnDef::new(EmailRecords::SentAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(EmailRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_email_records_target")
                        .table(EmailRecords::Table)
                        .col(EmailRecords::TargetKind)
                        .col(EmailRecords::TargetId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Leads::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Leads::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Leads::Email).string().not_null())
                        .col(ColumnDef::new(Leads::LeadType).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Leads::Unsubscribed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Leads::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_leads_email")
                        .table(Leads::Table)
                        .col(Leads::Email)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Leads::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(EmailRecords::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub enum EmailRecords {
        Table,
        Id,
        EmailType,
        TargetKind,
        TargetId,
        Status,
        ErrorMessage,
        SentAt,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum Leads {
        Table,
        Id,
        Email,
        LeadType,
        Unsubscribed,
        CreatedAt,
    }
}
