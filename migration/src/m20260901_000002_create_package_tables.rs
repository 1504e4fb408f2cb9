use sea_orm_migration::prelude::*;

/// 打包产品
#[derive(DeriveIden)]
enum PkgProducts {
    Table,
    Id,
    Code,
    Name,
    StayDays,
    Status,
    SaleStartDate,
    SaleEndDate,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

/// 产品 × 酒店 × 房型
#[derive(DeriveIden)]
enum PkgProductHotelRoomTypes {
    Table,
    Id,
    ProductId,
    HotelId,
    RoomTypeId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

/// 产品包含的门票
#[derive(DeriveIden)]
enum PkgProductBundleItems {
    Table,
    Id,
    ProductId,
    TicketId,
    Quantity,
    CreatedAt,
    UpdatedAt,
}

/// 每日价格缓存
#[derive(DeriveIden)]
enum PkgProductDailyPrices {
    Table,
    Id,
    ProductId,
    HotelId,
    RoomTypeId,
    BizDate,
    SalePrice,
    CostPrice,
    CompositeCode,
    LastUpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PkgProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PkgProducts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PkgProducts::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PkgProducts::Name).string().not_null())
                    .col(
                        ColumnDef::new(PkgProducts::StayDays)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(PkgProducts::Status)
                            .string_len(16)
                            .not_null()
                            .default("disabled"),
                    )
                    .col(ColumnDef::new(PkgProducts::SaleStartDate).date().null())
                    .col(ColumnDef::new(PkgProducts::SaleEndDate).date().null())
                    .col(
                        ColumnDef::new(PkgProducts::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PkgProducts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PkgProducts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PkgProductHotelRoomTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::HotelId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::RoomTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PkgProductHotelRoomTypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pkg_hotel_room_types_product")
                            .from(
                                PkgProductHotelRoomTypes::Table,
                                PkgProductHotelRoomTypes::ProductId,
                            )
                            .to(PkgProducts::Table, PkgProducts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pkg_hotel_room_types_unique")
                    .table(PkgProductHotelRoomTypes::Table)
                    .col(PkgProductHotelRoomTypes::ProductId)
                    .col(PkgProductHotelRoomTypes::HotelId)
                    .col(PkgProductHotelRoomTypes::RoomTypeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 库存变更反查产品
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pkg_hotel_room_types_hotel_room")
                    .table(PkgProductHotelRoomTypes::Table)
                    .col(PkgProductHotelRoomTypes::HotelId)
                    .col(PkgProductHotelRoomTypes::RoomTypeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PkgProductBundleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PkgProductBundleItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PkgProductBundleItems::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductBundleItems::TicketId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductBundleItems::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(PkgProductBundleItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PkgProductBundleItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pkg_bundle_items_product")
                            .from(
                                PkgProductBundleItems::Table,
                                PkgProductBundleItems::ProductId,
                            )
                            .to(PkgProducts::Table, PkgProducts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 门票价格变更反查产品
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pkg_bundle_items_ticket")
                    .table(PkgProductBundleItems::Table)
                    .col(PkgProductBundleItems::TicketId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PkgProductDailyPrices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::HotelId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::RoomTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::BizDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::SalePrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::CostPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::CompositeCode)
                            .string_len(96)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgProductDailyPrices::LastUpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pkg_daily_prices_cell_unique")
                    .table(PkgProductDailyPrices::Table)
                    .col(PkgProductDailyPrices::ProductId)
                    .col(PkgProductDailyPrices::HotelId)
                    .col(PkgProductDailyPrices::RoomTypeId)
                    .col(PkgProductDailyPrices::BizDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PkgProductDailyPrices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PkgProductBundleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(PkgProductHotelRoomTypes::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(PkgProducts::Table).to_owned())
            .await?;
        Ok(())
    }
}
